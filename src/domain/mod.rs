pub mod callsign;
pub mod geo;
pub mod maidenhead;
pub mod packet;
pub mod weather;

pub use callsign::Callsign;
pub use geo::GeoCoordinate;
pub use maidenhead::MaidenheadLocator;
pub use packet::{Packet, PacketFields, PacketType};
pub use weather::WeatherData;
