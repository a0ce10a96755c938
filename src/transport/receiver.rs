//! Receiver loop: pulls bytes from the serial reader and feeds the link parser.
use crate::core::RX_CHUNK_LEN;
use crate::error::TransportError;
use crate::link::LinkPhy;
use crate::transport::{SerialRead, SerialWrite};

/// Read from `reader` forever, pushing every byte into `link`.
///
/// Returns only when the reader fails or a reassembled frame cannot be
/// posted to the link task.
pub async fn run_receiver<R, W, const TASKS: usize, const DEPTH: usize, const SLOTS: usize>(
    link: &LinkPhy<'_, W, TASKS, DEPTH, SLOTS>,
    reader: &mut R,
) -> Result<(), TransportError<R::Error>>
where
    R: SerialRead,
    W: SerialWrite,
{
    let mut buf = [0u8; RX_CHUNK_LEN];
    loop {
        let n = reader.read(&mut buf).await.map_err(TransportError::Read)?;
        if n == 0 {
            continue;
        }
        #[cfg(feature = "defmt")]
        defmt::trace!("RX {} bytes", n);
        link.receive_bytes(&buf[..n])?;
    }
}
