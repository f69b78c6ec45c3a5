pub mod datetime;
pub mod export;
pub mod records;
pub mod upcoming;
pub mod weekly;
