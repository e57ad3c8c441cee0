//! Header loading, coordinate input and result output shared by the
//! subcommands.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::Context;
use fitswcs::header::CARD_SIZE;
use fitswcs::{parse_header, Origin, Wcs, WcsBuilder};
use serde::Serialize;

pub fn load_wcs(path: &Path) -> anyhow::Result<Wcs> {
    let bytes = fs::read(path).with_context(|| format!("reading header {:?}", path))?;
    let text = header_text(&bytes);
    let header = parse_header(&text).with_context(|| format!("parsing header {:?}", path))?;
    log::debug!("{:?}: {} keywords", path, header.len());
    let wcs = WcsBuilder::from_header(&header)
        .and_then(WcsBuilder::build)
        .with_context(|| format!("building WCS from {:?}", path))?;
    Ok(wcs)
}

/// Header portion of a file. Fixed-width FITS headers are cut at the END
/// card so that binary data after it is never parsed.
fn header_text(bytes: &[u8]) -> String {
    if bytes.iter().take(CARD_SIZE).any(|&b| b == b'\n') {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    let end = bytes
        .chunks(CARD_SIZE)
        .position(|card| card.starts_with(b"END") && card[3..].iter().all(|&b| b == b' '))
        .map_or(bytes.len(), |index| (index + 1) * CARD_SIZE);
    String::from_utf8_lossy(&bytes[..end.min(bytes.len())]).into_owned()
}

pub fn origin(value: i64) -> anyhow::Result<Origin> {
    Ok(Origin::try_from(value)?)
}

/// Coordinate pairs from the command line, or from stdin when none were
/// given.
pub fn read_pairs(values: &[f64]) -> anyhow::Result<Vec<[f64; 2]>> {
    if !values.is_empty() {
        return pairs_from_values(values);
    }
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("reading coordinates from stdin")?;
    parse_pairs(&text)
}

pub fn parse_pairs(text: &str) -> anyhow::Result<Vec<[f64; 2]>> {
    let values = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f64>()
                .with_context(|| format!("invalid coordinate '{}'", token))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    pairs_from_values(&values)
}

pub fn pairs_from_values(values: &[f64]) -> anyhow::Result<Vec<[f64; 2]>> {
    if values.len() % 2 != 0 {
        anyhow::bail!("expected coordinate pairs, got {} values", values.len());
    }
    Ok(values.chunks_exact(2).map(|c| [c[0], c[1]]).collect())
}

#[derive(Serialize)]
struct Conversion {
    input: [f64; 2],
    output: [Option<f64>; 2],
}

/// Prints one line per pair, or a JSON array when `json` is set. NaN results
/// are written as `null` in JSON.
pub fn print_pairs(inputs: &[[f64; 2]], outputs: &[[f64; 2]], json: bool) -> anyhow::Result<()> {
    if json {
        let rows: Vec<Conversion> = inputs
            .iter()
            .zip(outputs)
            .map(|(input, output)| Conversion {
                input: *input,
                output: output.map(|v| v.is_finite().then_some(v)),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    for (input, output) in inputs.iter().zip(outputs) {
        println!(
            "{:.6} {:.6} -> {:.10} {:.10}",
            input[0], input[1], output[0], output[1]
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs("1 2\n3.5,-4\n  5e1 6 ").unwrap();
        assert_eq!(pairs, vec![[1.0, 2.0], [3.5, -4.0], [50.0, 6.0]]);
        assert!(parse_pairs("1 2 3").is_err());
        assert!(parse_pairs("1 x").is_err());
        assert!(parse_pairs("").unwrap().is_empty());
    }

    #[test]
    fn test_load_wcs_from_file() {
        let cards = [
            "NAXIS   =                    2",
            "NAXIS1  =                  100",
            "NAXIS2  =                  200",
            "CTYPE1  = 'RA---TAN'",
            "CTYPE2  = 'DEC--TAN'",
            "CRPIX1  =                 50.0",
            "CRPIX2  =                100.0",
            "CRVAL1  =                 10.0",
            "CRVAL2  =                -30.0",
            "CD1_1   =              -0.0001",
            "CD2_2   =               0.0001",
            "END",
        ];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for card in cards {
            write!(file, "{:<80}", card).unwrap();
        }
        file.flush().unwrap();

        let wcs = load_wcs(file.path()).unwrap();
        assert_eq!(wcs.image_shape(), Some([100, 200]));
        assert_eq!(wcs.crval(), [10.0, -30.0]);
    }

    #[test]
    fn test_header_text_stops_at_end() {
        let mut bytes = format!("{:<80}{:<80}", "NAXIS   =                    2", "END").into_bytes();
        bytes.extend_from_slice(&[0xff, b'\n', 0x00, 0x42]);
        let text = header_text(&bytes);
        assert_eq!(text.len(), 160);
        assert!(text.ends_with(' '));
    }

    #[test]
    fn test_load_wcs_reports_path() {
        let err = load_wcs(Path::new("/nonexistent/header.hdr")).unwrap_err();
        assert!(format!("{:#}", err).contains("header.hdr"));
    }

    #[test]
    fn test_origin() {
        assert_eq!(origin(0).unwrap(), Origin::Zero);
        assert_eq!(origin(1).unwrap(), Origin::One);
        assert!(origin(2).is_err());
    }
}
