pub mod article;
pub mod auth;
pub mod category;
pub mod dashboard;
pub mod media;
pub mod notification;
pub mod public;
pub mod sitemap;
pub mod tag;
