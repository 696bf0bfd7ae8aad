//! Portable Float Map reader and writer.
//!
//! `Pf` files hold one channel and load as `GrayS` frames; `PF` files hold
//! interleaved RGB and load as planar `RGBS` frames. Rows are stored bottom
//! to top. A negative scale in the header marks little-endian samples.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use fgrain_core::format::{GRAY_S, RGB_S};
use fgrain_core::{ColorFamily, Frame, FrameProps, Plane};

/// Reads a PFM file into a float frame.
pub fn read(path: &Path) -> Result<Frame> {
    let file = File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
    read_from(&mut BufReader::new(file)).with_context(|| format!("Failed to read PFM: {}", path.display()))
}

/// Writes a float frame as little-endian PFM.
pub fn write(path: &Path, frame: &Frame) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create: {}", path.display()))?;
    let mut w = BufWriter::new(file);
    write_to(&mut w, frame).with_context(|| format!("Failed to write PFM: {}", path.display()))?;
    w.flush()?;
    Ok(())
}

/// Next whitespace-delimited header token; consumes one trailing delimiter.
fn read_token<R: BufRead>(r: &mut R) -> Result<String> {
    let mut token = Vec::new();
    loop {
        let byte = match r.read_u8() {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof && !token.is_empty() => break,
            Err(e) => return Err(e).context("truncated PFM header"),
        };
        if byte.is_ascii_whitespace() {
            if token.is_empty() {
                continue;
            }
            break;
        }
        token.push(byte);
        if token.len() > 64 {
            bail!("malformed PFM header");
        }
    }
    Ok(String::from_utf8_lossy(&token).into_owned())
}

pub fn read_from<R: BufRead>(r: &mut R) -> Result<Frame> {
    let channels = match read_token(r)?.as_str() {
        "Pf" => 1,
        "PF" => 3,
        other => bail!("not a PFM file (magic '{other}')"),
    };
    let width: u32 = read_token(r)?.parse().context("invalid PFM width")?;
    let height: u32 = read_token(r)?.parse().context("invalid PFM height")?;
    let scale: f32 = read_token(r)?.parse().context("invalid PFM scale")?;
    if width == 0 || height == 0 {
        bail!("PFM has zero size {width}x{height}");
    }
    if scale == 0.0 || !scale.is_finite() {
        bail!("invalid PFM scale {scale}");
    }

    let (w, h) = (width as usize, height as usize);
    let count = w
        .checked_mul(h)
        .and_then(|v| v.checked_mul(channels))
        .context("PFM dimensions overflow")?;
    let mut interleaved = vec![0.0f32; count];
    if scale < 0.0 {
        r.read_f32_into::<LittleEndian>(&mut interleaved)
    } else {
        r.read_f32_into::<BigEndian>(&mut interleaved)
    }
    .context("truncated PFM data")?;

    let mut planes = vec![vec![0.0f32; w * h]; channels];
    for (file_row, src) in interleaved.chunks_exact(w * channels).enumerate() {
        let y = h - 1 - file_row;
        for (x, px) in src.chunks_exact(channels).enumerate() {
            for (c, v) in px.iter().enumerate() {
                planes[c][y * w + x] = *v;
            }
        }
    }

    let format = if channels == 1 { GRAY_S } else { RGB_S };
    let planes = planes
        .into_iter()
        .map(|data| Plane::from_vec(width, height, w, data))
        .collect::<fgrain_core::Result<Vec<_>>>()?;
    Ok(Frame::from_planes(format, planes, FrameProps::new())?)
}

pub fn write_to<W: Write>(w: &mut W, frame: &Frame) -> Result<()> {
    let format = frame.format();
    if !format.is_float32() {
        bail!("PFM output needs 32-bit float frames, got {format}");
    }
    let (magic, channels) = match format.color_family {
        ColorFamily::Gray => ("Pf", 1),
        ColorFamily::Rgb | ColorFamily::Yuv => {
            if format.sub_sampling_w != 0 || format.sub_sampling_h != 0 {
                bail!("PFM output cannot store subsampled {format}");
            }
            ("PF", 3)
        }
    };
    let width = frame.width(0);
    let height = frame.height(0);
    write!(w, "{magic}\n{width} {height}\n-1.0\n")?;

    let views = (0..channels)
        .map(|p| frame.plane_f32(p))
        .collect::<fgrain_core::Result<Vec<_>>>()?;
    for y in (0..height).rev() {
        for x in 0..width {
            for view in &views {
                w.write_f32::<LittleEndian>(view.get(x, y))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fgrain_core::FrameBuilder;
    use std::io::Cursor;

    fn gradient(format: fgrain_core::VideoFormat, w: u32, h: u32) -> Frame {
        let mut b = FrameBuilder::new(format, w, h);
        for p in 0..b.num_planes() {
            let mut view = b.plane_f32_mut(p).unwrap();
            for y in 0..h {
                for (x, v) in view.row_mut(y).iter_mut().enumerate() {
                    *v = p as f32 * 100.0 + y as f32 * 10.0 + x as f32;
                }
            }
        }
        b.freeze()
    }

    #[test]
    fn test_gray_round_trip() {
        let frame = gradient(GRAY_S, 5, 3);
        let mut buf = Vec::new();
        write_to(&mut buf, &frame).unwrap();
        assert!(buf.starts_with(b"Pf\n5 3\n-1.0\n"));

        let back = read_from(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back.format(), GRAY_S);
        assert_eq!(back.plane_f32(0).unwrap().get(4, 2), 24.0);
        assert_eq!(back.plane_f32(0).unwrap().get(0, 0), 0.0);
    }

    #[test]
    fn test_rgb_round_trip() {
        let frame = gradient(RGB_S, 4, 2);
        let mut buf = Vec::new();
        write_to(&mut buf, &frame).unwrap();
        let back = read_from(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back.format(), RGB_S);
        for p in 0..3 {
            assert_eq!(
                back.plane_f32(p).unwrap().get(3, 1),
                frame.plane_f32(p).unwrap().get(3, 1)
            );
        }
    }

    #[test]
    fn test_bottom_up_big_endian() {
        // 1x2 big-endian grey: first stored row is the bottom one
        let mut buf = b"Pf\n1 2\n1.0\n".to_vec();
        buf.extend_from_slice(&1.0f32.to_be_bytes());
        buf.extend_from_slice(&2.0f32.to_be_bytes());
        let frame = read_from(&mut Cursor::new(buf)).unwrap();
        let view = frame.plane_f32(0).unwrap();
        assert_eq!(view.get(0, 0), 2.0);
        assert_eq!(view.get(0, 1), 1.0);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(read_from(&mut Cursor::new(b"P6\n1 1\n255\n".to_vec())).is_err());
        assert!(read_from(&mut Cursor::new(b"Pf\n2 2\n-1.0\n\0\0\0\0".to_vec())).is_err());
        assert!(read_from(&mut Cursor::new(b"Pf\n0 2\n-1.0\n".to_vec())).is_err());

        let int_frame = Frame::filled(fgrain_core::format::GRAY_8, 2, 2, 0.5);
        assert!(write_to(&mut Vec::new(), &int_frame).is_err());
    }

    #[test]
    fn test_file_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.pfm");
        let frame = gradient(GRAY_S, 7, 4);
        write(&path, &frame).unwrap();
        let back = read(&path).unwrap();
        assert_eq!(
            back.plane(0).unwrap().to_packed::<f32>().unwrap(),
            frame.plane(0).unwrap().to_packed::<f32>().unwrap()
        );
    }
}
