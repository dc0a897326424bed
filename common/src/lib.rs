pub mod address;
pub mod order;
pub mod parcel;
pub mod product;
pub mod tracking;
