pub mod activities;
pub mod leads;
