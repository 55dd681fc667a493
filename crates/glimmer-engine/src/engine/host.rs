/// The surface the particle field is mounted into.
pub trait Host {
    /// Current drawable size in physical pixels.
    fn client_size(&self) -> (u32, u32);
}
