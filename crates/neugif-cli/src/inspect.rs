//! Block-level walk over a GIF stream. Reports structure only; image data
//! is skipped, not decompressed.

use std::fmt;

#[derive(Debug, Default, PartialEq)]
pub struct GifSummary {
    pub version: String,
    pub width: u16,
    pub height: u16,
    pub global_table: Option<usize>,
    pub loop_count: Option<u16>,
    pub comments: Vec<String>,
    pub frames: Vec<FrameSummary>,
}

#[derive(Debug, Default, PartialEq)]
pub struct FrameSummary {
    pub width: u16,
    pub height: u16,
    pub delay_cs: u16,
    pub disposal: u8,
    pub transparent: Option<u8>,
    pub local_table: Option<usize>,
    pub data_len: usize,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        let end = self.pos + n;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| format!("unexpected end of data at offset {}", self.pos))?;
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, String> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, String> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Concatenated payload of a sub-block chain, consuming the terminator.
    fn sub_blocks(&mut self) -> Result<Vec<u8>, String> {
        let mut payload = Vec::new();
        loop {
            let len = self.u8()? as usize;
            if len == 0 {
                return Ok(payload);
            }
            payload.extend_from_slice(self.take(len)?);
        }
    }
}

fn table_len(flags: u8) -> Option<usize> {
    (flags & 0x80 != 0).then(|| 1usize << ((flags & 0x07) + 1))
}

impl GifSummary {
    pub fn parse(data: &[u8]) -> Result<Self, String> {
        let mut cur = Cursor { data, pos: 0 };
        let header = cur.take(6)?;
        if &header[..3] != b"GIF" {
            return Err("not a GIF file".into());
        }

        let mut summary = GifSummary {
            version: String::from_utf8_lossy(&header[3..]).into_owned(),
            width: cur.u16()?,
            height: cur.u16()?,
            ..Default::default()
        };
        let flags = cur.u8()?;
        cur.take(2)?; // background index, aspect ratio
        summary.global_table = table_len(flags);
        if let Some(n) = summary.global_table {
            cur.take(n * 3)?;
        }

        let mut pending = FrameSummary::default();
        loop {
            match cur.u8()? {
                0x21 => {
                    let label = cur.u8()?;
                    let body = cur.sub_blocks()?;
                    match label {
                        0xF9 if body.len() >= 4 => {
                            pending.disposal = (body[0] >> 2) & 0x07;
                            pending.delay_cs = u16::from_le_bytes([body[1], body[2]]);
                            pending.transparent = (body[0] & 0x01 != 0).then_some(body[3]);
                        }
                        0xFF if body.starts_with(b"NETSCAPE2.0") && body.len() >= 14 => {
                            summary.loop_count = Some(u16::from_le_bytes([body[12], body[13]]));
                        }
                        0xFE => summary
                            .comments
                            .push(String::from_utf8_lossy(&body).into_owned()),
                        _ => {}
                    }
                }
                0x2C => {
                    cur.take(4)?; // left, top
                    pending.width = cur.u16()?;
                    pending.height = cur.u16()?;
                    let flags = cur.u8()?;
                    pending.local_table = table_len(flags);
                    if let Some(n) = pending.local_table {
                        cur.take(n * 3)?;
                    }
                    cur.u8()?; // LZW minimum code size
                    pending.data_len = cur.sub_blocks()?.len();
                    summary.frames.push(std::mem::take(&mut pending));
                }
                0x3B => return Ok(summary),
                other => {
                    return Err(format!(
                        "unknown block 0x{other:02X} at offset {}",
                        cur.pos - 1
                    ))
                }
            }
        }
    }
}

impl fmt::Display for GifSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "GIF{} {}x{}", self.version, self.width, self.height)?;
        match self.global_table {
            Some(n) => writeln!(f, "Global color table: {n} entries")?,
            None => writeln!(f, "Global color table: none")?,
        }
        match self.loop_count {
            Some(0) => writeln!(f, "Repeat: forever")?,
            Some(n) => writeln!(f, "Repeat: {n} times")?,
            None => writeln!(f, "Repeat: none")?,
        }
        for comment in &self.comments {
            writeln!(f, "Comment: {comment:?}")?;
        }
        writeln!(f, "Frames: {}", self.frames.len())?;
        for (i, frame) in self.frames.iter().enumerate() {
            write!(
                f,
                "  #{i}: {}x{} delay={}cs disposal={}",
                frame.width, frame.height, frame.delay_cs, frame.disposal
            )?;
            if let Some(t) = frame.transparent {
                write!(f, " transparent={t}")?;
            }
            if let Some(n) = frame.local_table {
                write!(f, " local_table={n}")?;
            }
            writeln!(f, " data={} bytes", frame.data_len)?;
        }
        Ok(())
    }
}
