pub(crate) mod hops;
pub(crate) mod info;
pub(crate) mod steps;
