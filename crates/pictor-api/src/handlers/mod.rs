pub mod assets;
pub mod assignments;
pub mod onedrive;
pub mod strategies;
pub mod upload;
