pub(crate) mod caption;
pub(crate) mod compositor;
pub(crate) mod frame;
pub(crate) mod scene;
pub(crate) mod schedule;
