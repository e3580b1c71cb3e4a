use tracking::database::DatabaseError;

pub mod vehicle;

pub(crate) fn convert_error(why: sqlx::Error) -> DatabaseError {
    match why {
        sqlx::Error::RowNotFound => DatabaseError::NotFound,
        sqlx::Error::Database(error) if error.is_unique_violation() => {
            DatabaseError::Duplicate(match error.constraint() {
                Some("vehicles_bus_number_key") => "Bus number already exists".to_owned(),
                Some("vehicles_pkey") => "Vehicle id already exists".to_owned(),
                _ => error.message().to_owned(),
            })
        }
        _ => DatabaseError::Other(Box::new(why)),
    }
}
