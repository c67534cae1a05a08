//! Data model for explored states
//!
//! # Components
//!
//! - `CrawlUrl`: an address in the frontier with its discovery depth
//! - `WebPage` / `DeltaPage`: explored states and the content they carry
//! - `Clickable` / `ClickableType`: actionable elements and their classification

mod clickable;
mod crawl_url;
mod page;

pub use clickable::{Clickable, ClickableType};
pub use crawl_url::CrawlUrl;
pub use page::{AjaxRequest, DeltaPage, Form, FormInput, Link, Page, PageContent, PageId, WebPage};
