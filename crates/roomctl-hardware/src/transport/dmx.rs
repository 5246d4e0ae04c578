use roomctl_network::{DmxFrame, EnttecProPort};

use crate::error::Result;
use crate::traits::DmxOutput;

impl DmxOutput for EnttecProPort {
    async fn write_frame(&mut self, frame: &DmxFrame) -> Result<()> {
        EnttecProPort::write_frame(self, frame).await?;
        Ok(())
    }

    fn close(&mut self) {
        EnttecProPort::close(self);
    }
}
