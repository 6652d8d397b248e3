pub mod intake;
pub mod voting;
pub mod workbook;
