//! Text-column mapping for closed status enums.

pub use rusqlite;

/// Implements `ToSql`/`FromSql` for an enum that exposes `as_str()` and
/// `FromStr<Err = String>`, storing it as its snake_case name.
#[macro_export]
macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl $crate::sql::rusqlite::types::ToSql for $ty {
            fn to_sql(
                &self,
            ) -> $crate::sql::rusqlite::Result<$crate::sql::rusqlite::types::ToSqlOutput<'_>> {
                Ok($crate::sql::rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl $crate::sql::rusqlite::types::FromSql for $ty {
            fn column_result(
                value: $crate::sql::rusqlite::types::ValueRef<'_>,
            ) -> $crate::sql::rusqlite::types::FromSqlResult<Self> {
                let text = value.as_str()?;
                text.parse::<$ty>().map_err(|e: String| {
                    $crate::sql::rusqlite::types::FromSqlError::Other(e.into())
                })
            }
        }
    };
}
