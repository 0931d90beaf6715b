use crate::{
    error::{Error, Result},
    raw::buffer::{ChunkedBuffer, LengthSlot},
    spec::ElementType,
};

/// Writes one length-prefixed document or array body. Opening reserves the length slot; dropping
/// the writer appends the terminator and backpatches the final length.
pub(crate) struct DocWriter<'a> {
    data: &'a mut ChunkedBuffer,
    slot: LengthSlot,
}

impl<'a> DocWriter<'a> {
    pub(crate) fn open(data: &'a mut ChunkedBuffer) -> Self {
        let slot = data.reserve_length();
        Self { data, slot }
    }

    pub(crate) fn append_key(&mut self, element_type: ElementType, name: &str) -> Result<()> {
        self.data.push(element_type as u8);
        write_cstring(self.data, name)
    }

    pub(crate) fn buffer(&mut self) -> &mut ChunkedBuffer {
        self.data
    }
}

impl Drop for DocWriter<'_> {
    fn drop(&mut self) {
        self.data.push(0);
        let len = self.data.len() - self.slot.position();
        self.data.backpatch(self.slot, len as i32);
    }
}

pub(crate) fn write_cstring(buf: &mut ChunkedBuffer, s: &str) -> Result<()> {
    if s.as_bytes().contains(&0) {
        return Err(Error::format(format!("cstring with interior null: {s:?}")));
    }
    buf.write_bytes(s.as_bytes());
    buf.push(0);
    Ok(())
}
