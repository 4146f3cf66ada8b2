pub mod calendar;
pub mod db;
