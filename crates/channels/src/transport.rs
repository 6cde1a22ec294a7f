/// Outbound commands the registry issues to the chat transport.
///
/// Both calls are fire-and-forget: implementations must not block on network
/// I/O and the registry never waits for an acknowledgement. They are invoked
/// while the registry lock is held, so JOIN and PART for one channel reach the
/// transport in the order the subscription changes happened.
pub trait ChannelCommands: Send + Sync {
    fn send_join(&self, channel: &str);
    fn send_leave(&self, channel: &str);
}
