pub mod list_store;

pub use list_store::{FetchedPage, ListState, LoadMode, LoadMore, PageFetcher, RemoteListStore};
