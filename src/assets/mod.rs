pub(crate) mod decode;
pub(crate) mod decoder;
pub(crate) mod media;
pub(crate) mod svg_raster;
pub(crate) mod text;
