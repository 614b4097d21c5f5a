pub mod browser;
pub mod pagination;
pub mod traits;

pub use browser::OlxBrowserFetcher;
pub use pagination::PaginationDriver;
pub use traits::{ListingDetails, PageFetcher};
