pub mod codec;
pub mod decision;
pub mod packet;

pub use codec::PacketCodec;
pub use decision::{Decision, decode};
pub use packet::{BiometricToken, Packet};
