pub(crate) mod mix;
pub(crate) mod mouth;
pub(crate) mod pcm;
