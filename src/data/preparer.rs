//! Data Preparer Module
//! Joins consultations to users and derives the numeric and date columns
//! the charts are built from.

use crate::config::{
    COL_DATE, COL_DATE_JOINED, COL_DATE_ONLY, COL_DURATION, COL_DURATION_NUMERIC, COL_EMAIL,
    COL_INTENSITY, COL_INTENSITY_NUMERIC, COL_PATHOLOGY, COL_USERNAME, COL_USER_ID, COL_USER_REF,
    CONSULTATIONS_TABLE, USERS_TABLE, USER_COLUMN_SUFFIX,
};
use crate::data::ordinal::{duration_score, intensity_score};
use crate::data::store::{extract, Relation, Store, StoreError};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Unparseable date in row {row}: '{value}'")]
    InvalidDate { row: usize, value: String },
}

#[derive(Error, Debug)]
pub enum PrepareError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// One consultation after the join, with derived fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedConsultation {
    pub user_id: Option<String>,
    pub user_matched: bool,
    pub pathology: Option<String>,
    pub intensity_label: Option<String>,
    pub duration_label: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub date_joined: Option<String>,
    pub intensity_numeric: Option<i32>,
    pub duration_numeric: Option<i32>,
    pub date_only: Option<NaiveDate>,
}

/// Prepared consultations, both as a DataFrame carrying every stored
/// column and as typed rows for the known fields.
#[derive(Debug, Clone)]
pub struct EnrichedTable {
    df: DataFrame,
    rows: Vec<EnrichedConsultation>,
    unmatched_users: usize,
    unmapped_intensity: usize,
    unmapped_duration: usize,
}

impl EnrichedTable {
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn rows(&self) -> &[EnrichedConsultation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Rows whose user reference found no user.
    pub fn unmatched_users(&self) -> usize {
        self.unmatched_users
    }

    /// Rows with a non-null intensity label outside the scale.
    pub fn unmapped_intensity(&self) -> usize {
        self.unmapped_intensity
    }

    /// Rows with a non-null duration label outside the scale.
    pub fn unmapped_duration(&self) -> usize {
        self.unmapped_duration
    }
}

/// Stateless single-pass transformation from store to enriched table.
pub struct DataPreparer;

impl DataPreparer {
    /// Extract, join and derive.
    ///
    /// The join is left-outer on `user_id = id`: every consultation is kept,
    /// in store order, and unmatched rows get missing user fields. A single
    /// unparseable date rejects the whole batch.
    pub fn prepare(store: &Store) -> Result<EnrichedTable, PrepareError> {
        let consultations = extract(CONSULTATIONS_TABLE, store)?;
        let users = extract(USERS_TABLE, store)?;

        Self::require_columns(
            &consultations,
            Relation::Consultations,
            &[COL_USER_REF, COL_PATHOLOGY, COL_INTENSITY, COL_DURATION, COL_DATE],
        )?;
        let users = Self::project_users(&users)?;

        // Join keys on both sides become opaque strings.
        let consult_keys = Self::opaque_keys(consultations.column(COL_USER_REF)?)?;
        let user_keys = Self::opaque_keys(users.column(COL_USER_ID)?)?;

        let mut user_index: HashMap<&str, usize> = HashMap::with_capacity(user_keys.len());
        for (idx, key) in user_keys.iter().enumerate() {
            if let Some(key) = key {
                // First user wins so duplicates never multiply consultations.
                user_index.entry(key.as_str()).or_insert(idx);
            }
        }

        let usernames = Self::text_values(users.column(COL_USERNAME)?)?;
        let emails = Self::text_values(users.column(COL_EMAIL)?)?;
        let joined = Self::text_values(users.column(COL_DATE_JOINED)?)?;

        let pathologies = Self::text_values(consultations.column(COL_PATHOLOGY)?)?;
        let intensities = Self::text_values(consultations.column(COL_INTENSITY)?)?;
        let durations = Self::text_values(consultations.column(COL_DURATION)?)?;
        let dates = Self::parse_dates(consultations.column(COL_DATE)?)?;

        let mut rows = Vec::with_capacity(consultations.height());
        let mut unmatched_users = 0;
        let mut unmapped_intensity = 0;
        let mut unmapped_duration = 0;

        for i in 0..consultations.height() {
            let matched = consult_keys[i]
                .as_deref()
                .and_then(|key| user_index.get(key).copied());
            if matched.is_none() {
                unmatched_users += 1;
            }
            let user_field = |values: &[Option<String>]| matched.and_then(|u| values[u].clone());

            let intensity_numeric = intensity_score(intensities[i].as_deref());
            if intensity_numeric.is_none() && intensities[i].is_some() {
                unmapped_intensity += 1;
            }
            let duration_numeric = duration_score(durations[i].as_deref());
            if duration_numeric.is_none() && durations[i].is_some() {
                unmapped_duration += 1;
            }

            rows.push(EnrichedConsultation {
                user_id: consult_keys[i].clone(),
                user_matched: matched.is_some(),
                pathology: pathologies[i].clone(),
                intensity_label: intensities[i].clone(),
                duration_label: durations[i].clone(),
                date: dates[i],
                username: user_field(usernames.as_slice()),
                email: user_field(emails.as_slice()),
                date_joined: user_field(joined.as_slice()),
                intensity_numeric,
                duration_numeric,
                date_only: dates[i].map(|d| d.date()),
            });
        }

        if unmapped_intensity > 0 || unmapped_duration > 0 {
            tracing::warn!(
                unmapped_intensity,
                unmapped_duration,
                "Unknown ordinal labels left without a numeric value"
            );
        }

        let df = Self::build_frame(consultations, consult_keys, dates, &rows)?;

        tracing::info!(
            rows = rows.len(),
            users = users.height(),
            unmatched_users,
            "Prepared consultations"
        );

        Ok(EnrichedTable {
            df,
            rows,
            unmatched_users,
            unmapped_intensity,
            unmapped_duration,
        })
    }

    fn require_columns(
        df: &DataFrame,
        relation: Relation,
        columns: &[&str],
    ) -> Result<(), StoreError> {
        for name in columns {
            if df.column(name).is_err() {
                return Err(StoreError::MissingColumn {
                    relation,
                    column: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Keep only identifier, username, email and join date.
    fn project_users(users: &DataFrame) -> Result<DataFrame, PrepareError> {
        let columns = [COL_USER_ID, COL_USERNAME, COL_EMAIL, COL_DATE_JOINED];
        Self::require_columns(users, Relation::Users, &columns)?;
        Ok(users.select(columns)?)
    }

    /// Render a key column as trimmed strings so `1`, `1.0` and `"1"` agree.
    fn opaque_keys(column: &Column) -> Result<Vec<Option<String>>, PolarsError> {
        match column.dtype() {
            DataType::Float32 | DataType::Float64 => {
                let floats = column.cast(&DataType::Float64)?;
                Ok(floats
                    .f64()?
                    .into_iter()
                    .map(|v| {
                        v.map(|f| {
                            if f.is_finite() && f.fract() == 0.0 {
                                format!("{}", f as i64)
                            } else {
                                f.to_string()
                            }
                        })
                    })
                    .collect())
            }
            _ => Ok(Self::text_values(column)?
                .into_iter()
                .map(|v| v.map(|s| s.trim().to_string()))
                .collect()),
        }
    }

    fn text_values(column: &Column) -> Result<Vec<Option<String>>, PolarsError> {
        let text = column.cast(&DataType::String)?;
        Ok(text
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect())
    }

    fn parse_dates(column: &Column) -> Result<Vec<Option<NaiveDateTime>>, PrepareError> {
        match column.dtype() {
            DataType::Int64 | DataType::Float64 => {
                let secs = column.cast(&DataType::Float64)?;
                secs.f64()?
                    .into_iter()
                    .enumerate()
                    .map(|(row, v)| match v {
                        None => Ok(None),
                        Some(s) => Self::from_unix_seconds(s)
                            .map(Some)
                            .ok_or_else(|| invalid_date(row, s.to_string())),
                    })
                    .collect()
            }
            _ => Self::text_values(column)?
                .into_iter()
                .enumerate()
                .map(|(row, v)| match v.as_deref().map(str::trim) {
                    None | Some("") => Ok(None),
                    Some(s) => parse_timestamp(s)
                        .or_else(|| Self::numeric_text_seconds(s))
                        .map(Some)
                        .ok_or_else(|| invalid_date(row, s.to_string())),
                })
                .collect(),
        }
    }

    /// Unix seconds written as text, integer or real.
    fn numeric_text_seconds(value: &str) -> Option<NaiveDateTime> {
        value
            .parse::<i64>()
            .map(|secs| secs as f64)
            .or_else(|_| value.parse::<f64>())
            .ok()
            .and_then(Self::from_unix_seconds)
    }

    fn from_unix_seconds(secs: f64) -> Option<NaiveDateTime> {
        if !secs.is_finite() {
            return None;
        }
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1e9).round() as u32;
        DateTime::from_timestamp(whole as i64, nanos.min(999_999_999)).map(|d| d.naive_utc())
    }

    fn user_column_name(consultations: &DataFrame, name: &str) -> String {
        if consultations.column(name).is_ok() {
            format!("{name}{USER_COLUMN_SUFFIX}")
        } else {
            name.to_string()
        }
    }

    /// Consultation columns with the key, date and derived columns swapped in.
    ///
    /// User fields whose name is already a consultation column get a suffix,
    /// so the consultation's own value survives.
    fn build_frame(
        mut df: DataFrame,
        keys: Vec<Option<String>>,
        dates: Vec<Option<NaiveDateTime>>,
        rows: &[EnrichedConsultation],
    ) -> Result<DataFrame, PolarsError> {
        let usernames: Vec<Option<String>> = rows.iter().map(|r| r.username.clone()).collect();
        let emails: Vec<Option<String>> = rows.iter().map(|r| r.email.clone()).collect();
        let joined: Vec<Option<String>> = rows.iter().map(|r| r.date_joined.clone()).collect();
        let intensity: Vec<Option<i32>> = rows.iter().map(|r| r.intensity_numeric).collect();
        let duration: Vec<Option<i32>> = rows.iter().map(|r| r.duration_numeric).collect();
        let date_only: Vec<Option<NaiveDate>> = rows.iter().map(|r| r.date_only).collect();

        let user_columns = [
            (COL_USERNAME, usernames),
            (COL_EMAIL, emails),
            (COL_DATE_JOINED, joined),
        ];
        let names: Vec<String> = user_columns
            .iter()
            .map(|(name, _)| Self::user_column_name(&df, name))
            .collect();

        df.with_column(Column::new(COL_USER_REF.into(), keys))?;
        df.with_column(Column::new(COL_DATE.into(), dates))?;
        for (name, (_, values)) in names.into_iter().zip(user_columns) {
            df.with_column(Column::new(name.into(), values))?;
        }
        df.with_column(Column::new(COL_INTENSITY_NUMERIC.into(), intensity))?;
        df.with_column(Column::new(COL_DURATION_NUMERIC.into(), duration))?;
        df.with_column(Column::new(COL_DATE_ONLY.into(), date_only))?;
        Ok(df)
    }
}

fn invalid_date(row: usize, value: String) -> PrepareError {
    FormatError::InvalidDate { row, value }.into()
}

/// Parse the date shapes a Django SQLite store writes.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    // Offsets are dropped; the wall-clock time as written is kept.
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Free-function form of [`DataPreparer::prepare`].
pub fn prepare(store: &Store) -> Result<EnrichedTable, PrepareError> {
    DataPreparer::prepare(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::store::test_store;

    const USERS: &str = "
        CREATE TABLE auth_user (
            id INTEGER PRIMARY KEY, password TEXT, username TEXT,
            email TEXT, date_joined TEXT, is_staff INTEGER
        );
    ";

    const CONSULTATIONS: &str = "
        CREATE TABLE main_consulta (
            id INTEGER PRIMARY KEY, user_id, patologia TEXT,
            intensidad TEXT, duracion TEXT, fecha, notas TEXT
        );
    ";

    fn store_with(rows: &str) -> Store {
        test_store(&format!("{USERS}{CONSULTATIONS}{rows}"))
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn matched_consultation_gets_user_fields_and_scores() {
        let store = store_with(
            "INSERT INTO auth_user VALUES (1, 'h', 'ana', 'ana@example.com', '2023-11-02 08:00:00', 0);
             INSERT INTO main_consulta VALUES (1, 1, 'Migraine', 'Dolor Moderado', 'Media', '2024-01-05', NULL);",
        );

        let table = prepare(&store).unwrap();
        assert_eq!(table.len(), 1);

        let row = &table.rows()[0];
        assert!(row.user_matched);
        assert_eq!(row.username.as_deref(), Some("ana"));
        assert_eq!(row.email.as_deref(), Some("ana@example.com"));
        assert_eq!(row.date_joined.as_deref(), Some("2023-11-02 08:00:00"));
        assert_eq!(row.pathology.as_deref(), Some("Migraine"));
        assert_eq!(row.intensity_numeric, Some(2));
        assert_eq!(row.duration_numeric, Some(3));
        assert_eq!(row.date_only, Some(ymd(2024, 1, 5)));
        assert_eq!(table.unmatched_users(), 0);
    }

    #[test]
    fn unmatched_user_reference_keeps_the_row() {
        let store = store_with(
            "INSERT INTO auth_user VALUES (1, 'h', 'ana', 'ana@example.com', '2023-11-02', 0);
             INSERT INTO main_consulta VALUES (1, 99, 'Lumbago', 'Dolor Leve', 'Corta', '2024-02-01', NULL);
             INSERT INTO main_consulta VALUES (2, NULL, 'Cefalea', 'Sin Dolor', 'Larga', '2024-02-02', NULL);",
        );

        let table = prepare(&store).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.unmatched_users(), 2);

        let row = &table.rows()[0];
        assert_eq!(row.user_id.as_deref(), Some("99"));
        assert!(!row.user_matched);
        assert_eq!(row.username, None);
        assert_eq!(row.email, None);
        assert_eq!(row.date_joined, None);
        assert_eq!(row.pathology.as_deref(), Some("Lumbago"));
        assert_eq!(table.rows()[1].user_id, None);
    }

    #[test]
    fn row_count_and_order_follow_consultations() {
        let store = store_with(
            "INSERT INTO auth_user VALUES (2, 'h', 'luis', 'l@example.com', '2023-01-01', 0);
             INSERT INTO auth_user VALUES (1, 'h', 'ana', 'a@example.com', '2023-01-01', 0);
             INSERT INTO main_consulta VALUES (10, 2, 'C', 'Dolor Leve', 'Corta', '2024-01-03', NULL);
             INSERT INTO main_consulta VALUES (11, 7, 'B', 'Dolor Leve', 'Corta', '2024-01-02', NULL);
             INSERT INTO main_consulta VALUES (12, 1, 'A', 'Dolor Leve', 'Corta', '2024-01-01', NULL);
             INSERT INTO main_consulta VALUES (13, 2, 'D', 'Dolor Leve', 'Corta', '2024-01-04', NULL);",
        );

        let table = prepare(&store).unwrap();
        let pathologies: Vec<&str> = table
            .rows()
            .iter()
            .map(|r| r.pathology.as_deref().unwrap())
            .collect();
        assert_eq!(pathologies, vec!["C", "B", "A", "D"]);

        let users: Vec<Option<&str>> = table.rows().iter().map(|r| r.username.as_deref()).collect();
        assert_eq!(users, vec![Some("luis"), None, Some("ana"), Some("luis")]);
        assert_eq!(table.dataframe().height(), 4);
    }

    #[test]
    fn duplicate_user_ids_do_not_multiply_rows() {
        let store = test_store(&format!(
            "{CONSULTATIONS}
             CREATE TABLE auth_user (id, username TEXT, email TEXT, date_joined TEXT);
             INSERT INTO auth_user VALUES (1, 'first', 'f@example.com', '2023-01-01');
             INSERT INTO auth_user VALUES (1, 'second', 's@example.com', '2023-01-01');
             INSERT INTO main_consulta VALUES (1, 1, 'A', 'Dolor Leve', 'Corta', '2024-01-01', NULL);"
        ));

        let table = prepare(&store).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].username.as_deref(), Some("first"));
    }

    #[test]
    fn text_and_real_user_references_match_integer_ids() {
        let store = store_with(
            "INSERT INTO auth_user VALUES (1, 'h', 'ana', 'a@example.com', '2023-01-01', 0);
             INSERT INTO auth_user VALUES (2, 'h', 'luis', 'l@example.com', '2023-01-01', 0);
             INSERT INTO main_consulta VALUES (1, '1', 'A', 'Dolor Leve', 'Corta', '2024-01-01', NULL);
             INSERT INTO main_consulta VALUES (2, ' 2 ', 'B', 'Dolor Leve', 'Corta', '2024-01-01', NULL);",
        );
        let table = prepare(&store).unwrap();
        assert_eq!(table.rows()[0].username.as_deref(), Some("ana"));
        assert_eq!(table.rows()[1].username.as_deref(), Some("luis"));

        let store = store_with(
            "INSERT INTO auth_user VALUES (3, 'h', 'eva', 'e@example.com', '2023-01-01', 0);
             INSERT INTO main_consulta VALUES (1, 3.0, 'A', 'Dolor Leve', 'Corta', '2024-01-01', NULL);",
        );
        let table = prepare(&store).unwrap();
        assert_eq!(table.rows()[0].user_id.as_deref(), Some("3"));
        assert_eq!(table.rows()[0].username.as_deref(), Some("eva"));
    }

    #[test]
    fn unknown_labels_yield_missing_scores() {
        let store = store_with(
            "INSERT INTO main_consulta VALUES (1, 1, 'A', 'Dolor Extremo', 'Eterna', '2024-01-01', NULL);
             INSERT INTO main_consulta VALUES (2, 1, 'A', NULL, NULL, '2024-01-01', NULL);
             INSERT INTO main_consulta VALUES (3, 1, 'A', 'Dolor Insoportable', 'Muy Larga', '2024-01-01', NULL);",
        );

        let table = prepare(&store).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0].intensity_numeric, None);
        assert_eq!(table.rows()[0].duration_numeric, None);
        assert_eq!(table.rows()[1].intensity_numeric, None);
        assert_eq!(table.rows()[2].intensity_numeric, Some(5));
        assert_eq!(table.rows()[2].duration_numeric, Some(5));
        // Null labels are absent, not unmapped.
        assert_eq!(table.unmapped_intensity(), 1);
        assert_eq!(table.unmapped_duration(), 1);
    }

    #[test]
    fn date_only_ignores_time_of_day() {
        let store = store_with(
            "INSERT INTO main_consulta VALUES (1, 1, 'A', 'Dolor Leve', 'Corta', '2024-03-09 23:59:59.999999', NULL);
             INSERT INTO main_consulta VALUES (2, 1, 'A', 'Dolor Leve', 'Corta', '2024-03-09T00:00:01', NULL);
             INSERT INTO main_consulta VALUES (3, 1, 'A', 'Dolor Leve', 'Corta', '2024-03-09 12:30', NULL);
             INSERT INTO main_consulta VALUES (4, 1, 'A', 'Dolor Leve', 'Corta', NULL, NULL);",
        );

        let table = prepare(&store).unwrap();
        for row in &table.rows()[..3] {
            assert_eq!(row.date_only, Some(ymd(2024, 3, 9)));
        }
        assert_eq!(
            table.rows()[2].date.unwrap().time(),
            chrono::NaiveTime::from_hms_opt(12, 30, 0).unwrap()
        );
        assert_eq!(table.rows()[3].date, None);
        assert_eq!(table.rows()[3].date_only, None);
    }

    #[test]
    fn unparseable_date_rejects_the_batch() {
        let store = store_with(
            "INSERT INTO main_consulta VALUES (1, 1, 'A', 'Dolor Leve', 'Corta', '2024-01-01', NULL);
             INSERT INTO main_consulta VALUES (2, 1, 'A', 'Dolor Leve', 'Corta', 'ayer', NULL);",
        );

        match prepare(&store) {
            Err(PrepareError::Format(FormatError::InvalidDate { row, value })) => {
                assert_eq!(row, 1);
                assert_eq!(value, "ayer");
            }
            other => panic!("expected InvalidDate, got {other:?}"),
        }
    }

    #[test]
    fn integer_dates_are_unix_seconds() {
        let store = store_with(
            "INSERT INTO main_consulta VALUES (1, 1, 'A', 'Dolor Leve', 'Corta', 1704412800, NULL);",
        );
        let table = prepare(&store).unwrap();
        assert_eq!(table.rows()[0].date_only, Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn timezone_offsets_keep_the_written_calendar_date() {
        assert_eq!(
            parse_timestamp("2024-01-05 23:30:00+00:00").unwrap().date(),
            ymd(2024, 1, 5)
        );
        let late = parse_timestamp("2024-01-05T23:30:00-02:00").unwrap();
        assert_eq!(late.date(), ymd(2024, 1, 5));
        assert_eq!(late.time(), chrono::NaiveTime::from_hms_opt(23, 30, 0).unwrap());
        assert!(parse_timestamp("05/01/2024").is_none());
    }

    #[test]
    fn offset_timestamp_date_only_matches_the_stored_date() {
        let store = store_with(
            "INSERT INTO main_consulta VALUES (1, 1, 'A', 'Dolor Leve', 'Corta', '2024-01-05T23:30:00-02:00', NULL);",
        );
        let table = prepare(&store).unwrap();
        assert_eq!(table.rows()[0].date_only, Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn unix_seconds_parse_in_a_column_mixed_with_text_dates() {
        let store = store_with(
            "INSERT INTO main_consulta VALUES (1, 1, 'A', 'Dolor Leve', 'Corta', '2024-01-01 09:00:00', NULL);
             INSERT INTO main_consulta VALUES (2, 1, 'A', 'Dolor Leve', 'Corta', 1704412800, NULL);
             INSERT INTO main_consulta VALUES (3, 1, 'A', 'Dolor Leve', 'Corta', 1704412800.5, NULL);",
        );
        let table = prepare(&store).unwrap();
        assert_eq!(table.rows()[0].date_only, Some(ymd(2024, 1, 1)));
        assert_eq!(table.rows()[1].date_only, Some(ymd(2024, 1, 5)));
        assert_eq!(table.rows()[2].date_only, Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn consultation_columns_named_like_user_fields_are_not_overwritten() {
        let store = test_store(&format!(
            "{USERS}
             CREATE TABLE main_consulta (
                 id INTEGER PRIMARY KEY, user_id, patologia TEXT,
                 intensidad TEXT, duracion TEXT, fecha, email TEXT
             );
             INSERT INTO auth_user VALUES (1, 'h', 'ana', 'ana@example.com', '2023-01-01', 0);
             INSERT INTO main_consulta VALUES (1, 99, 'A', 'Dolor Leve', 'Corta', '2024-01-01', 'contact@x');
             INSERT INTO main_consulta VALUES (2, 1, 'A', 'Dolor Leve', 'Corta', '2024-01-01', 'front@x');"
        ));
        let table = prepare(&store).unwrap();
        let df = table.dataframe();

        let own = df.column(COL_EMAIL).unwrap().str().unwrap();
        assert_eq!(own.get(0), Some("contact@x"));
        assert_eq!(own.get(1), Some("front@x"));

        let joined = df.column("email_user").unwrap().str().unwrap();
        assert_eq!(joined.get(0), None);
        assert_eq!(joined.get(1), Some("ana@example.com"));

        // No collision, no suffix.
        assert!(df.column(COL_USERNAME).is_ok());
        assert!(df.column("username_user").is_err());
        assert_eq!(table.rows()[1].email.as_deref(), Some("ana@example.com"));
    }

    #[test]
    fn dataframe_keeps_extra_columns_and_adds_derived_ones() {
        let store = store_with(
            "INSERT INTO auth_user VALUES (1, 'h', 'ana', 'a@example.com', '2023-01-01', 0);
             INSERT INTO main_consulta VALUES (1, 1, 'A', 'Dolor Intenso', 'Larga', '2024-01-05 10:00:00', 'nota');",
        );
        let table = prepare(&store).unwrap();
        let df = table.dataframe();

        assert!(df.column("notas").is_ok());
        // Users are projected; their other columns never reach the output.
        assert!(df.column("is_staff").is_err());
        assert!(df.column("password").is_err());

        assert_eq!(df.column(COL_USER_REF).unwrap().dtype(), &DataType::String);
        assert!(matches!(
            df.column(COL_DATE).unwrap().dtype(),
            DataType::Datetime(_, _)
        ));
        assert_eq!(df.column(COL_DATE_ONLY).unwrap().dtype(), &DataType::Date);
        assert_eq!(
            df.column(COL_INTENSITY_NUMERIC).unwrap().i32().unwrap().get(0),
            Some(3)
        );
        assert_eq!(
            df.column(COL_DURATION_NUMERIC).unwrap().i32().unwrap().get(0),
            Some(4)
        );
    }

    #[test]
    fn missing_consultation_column_is_a_store_error() {
        let store = test_store(&format!(
            "{USERS}
             CREATE TABLE main_consulta (id INTEGER, user_id INTEGER, patologia TEXT);"
        ));
        match prepare(&store) {
            Err(PrepareError::Store(StoreError::MissingColumn { relation, column })) => {
                assert_eq!(relation, Relation::Consultations);
                assert_eq!(column, COL_INTENSITY);
            }
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn missing_users_relation_is_a_store_error() {
        let store = test_store(CONSULTATIONS);
        assert!(matches!(
            prepare(&store),
            Err(PrepareError::Store(StoreError::MissingRelation(Relation::Users)))
        ));
    }
}
