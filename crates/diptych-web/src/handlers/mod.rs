pub mod assist;
pub mod auth;
pub mod documents;
pub mod segments;
pub mod translate;
pub mod view;
