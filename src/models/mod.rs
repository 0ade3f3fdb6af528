pub mod anime;

pub use anime::{AiredRange, AnimeRecord, AnimeType, Genre, GenreCatalog, GenreRef};
