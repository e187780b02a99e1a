//! spacetraveling: a blog served from a headless content API.
//!
//! The listing page is seeded at startup and grows with "load more" requests
//! that follow the API's next-page cursors. Post pages are pre-rendered,
//! served from a cache and regenerated in the background once stale.

pub mod config;
pub mod dates;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pagination;
pub mod prismic;
pub mod reading_time;
pub mod render;
pub mod rich_text;
pub mod routes;
pub mod site;
pub mod state;
pub mod templates;
