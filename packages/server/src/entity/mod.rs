pub mod article;
pub mod article_tag;
pub mod category;
pub mod media;
pub mod notification;
pub mod publication_event;
pub mod role;
pub mod role_permission;
pub mod tag;
pub mod user;
