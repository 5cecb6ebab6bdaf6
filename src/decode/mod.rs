pub(crate) mod decoder;
pub(crate) mod image_file;
pub(crate) mod pixel_cache;
pub(crate) mod registry;
pub(crate) mod row;
