pub(crate) mod element;
pub(crate) mod mapper;
pub(crate) mod raster;
