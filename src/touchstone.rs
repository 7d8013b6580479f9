use std::fmt;
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use ndarray::prelude::*;
use nom::bytes::complete::take_till1;
use nom::character::complete::{char, space0, space1};
use nom::multi::separated_list0;
use nom::sequence::{pair, preceded};
use nom::IResult;
use num::Complex;
use regex::Regex;
use tracing::debug;

use crate::error::ParseError;
use crate::frequency::FreqUnit;
use crate::CxArray3;

#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub enum TouchstoneVersion {
    #[default]
    One,
    Two,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum ParamType {
    S,
    Y,
    Z,
    G,
    H,
}

impl FromStr for ParamType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ParamType::*;
        match s {
            "s" | "S" => Ok(S),
            "y" | "Y" => Ok(Y),
            "z" | "Z" => Ok(Z),
            "g" | "G" => Ok(G),
            "h" | "H" => Ok(H),
            _ => Err(ParseError::InvalidOption(format!("unknown parameter type {:?}", s))),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum ParamFormat {
    DBAngle,
    MagAngle,
    RealImag,
}

impl FromStr for ParamFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ParamFormat::*;
        match s {
            "db" | "DB" => Ok(DBAngle),
            "ma" | "MA" => Ok(MagAngle),
            "ri" | "RI" => Ok(RealImag),
            _ => Err(ParseError::InvalidOption(format!("unknown data format {:?}", s))),
        }
    }
}

impl ParamFormat {
    /// Converts one value pair of this format into a complex number.
    pub fn to_complex(self, a: f64, b: f64) -> Complex<f64> {
        match self {
            ParamFormat::RealImag => Complex::new(a, b),
            ParamFormat::MagAngle => Complex::from_polar(a, b.to_radians()),
            ParamFormat::DBAngle => Complex::from_polar(10f64.powf(a / 20.), b.to_radians()),
        }
    }
}

/// Ordering of the off-diagonal entries in 2-port data records.
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub enum TwoPortOrder {
    /// S11 S21 S12 S22, the version 1 layout
    #[default]
    TwentyOneTwelve,
    /// S11 S12 S21 S22
    TwelveTwentyOne,
}

#[derive(Debug, Clone)]
pub struct TouchstoneOptions {
    pub unit: FreqUnit,
    pub param_type: ParamType,
    pub param_format: ParamFormat,
    pub resistance: f64,
}

impl Default for TouchstoneOptions {
    fn default() -> Self {
        TouchstoneOptions {
            unit: FreqUnit::GHz,
            param_type: ParamType::S,
            param_format: ParamFormat::MagAngle,
            resistance: 50.,
        }
    }
}

/// One line of 2-port noise parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseRecord {
    /// Frequency in Hz
    pub freq: f64,
    pub nf_min_db: f64,
    pub gamma_opt: Complex<f64>,
    /// Effective noise resistance, normalized to the reference resistance
    pub rn: f64,
}

#[derive(PartialEq, Debug, Clone, Copy)]
enum Section {
    Network,
    Noise,
}

#[derive(Default)]
pub struct Touchstone {
    filename: String,
    version: TouchstoneVersion,
    comments: Vec<String>,
    num_ports: Option<usize>,
    freqs: Vec<f64>,
    num_freq_points: Option<usize>,
    num_noise_freq_points: Option<usize>,
    reference: Option<Vec<f64>>,
    two_port_order: TwoPortOrder,
    options: TouchstoneOptions,
    s_params: CxArray3,
    rank: usize,
    noise: Option<Vec<NoiseRecord>>,
}

fn keyword_regex() -> &'static Regex {
    static KEYWORD: OnceLock<Regex> = OnceLock::new();
    KEYWORD.get_or_init(|| Regex::new(r"^\[([^\]]+)\]\s*(.*)$").expect("keyword regex is valid"))
}

/// Number of ports implied by an `.sNp` extension, or `None` for `.ts`.
fn rank_from_extension(path: &Path) -> Result<Option<usize>, ParseError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if extension.len() > 2 && extension.starts_with('s') && extension.ends_with('p') {
        match extension.trim_start_matches('s').trim_end_matches('p').parse::<usize>() {
            Ok(rank) if rank > 0 => Ok(Some(rank)),
            _ => Err(ParseError::UnsupportedExtension(extension)),
        }
    } else if extension == "ts" {
        Ok(None)
    } else {
        Err(ParseError::UnsupportedExtension(extension))
    }
}

fn parse_values(line: &str, line_no: usize) -> Result<Vec<f64>, ParseError> {
    line.split_whitespace()
        .map(|v| {
            v.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
                line: line_no,
                token: v.to_owned(),
            })
        })
        .collect()
}

impl Touchstone {
    pub fn freqs(&self) -> Vec<f64> {
        self.freqs.clone()
    }

    pub fn s_params(&self) -> CxArray3 {
        self.s_params.clone()
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn version(&self) -> TouchstoneVersion {
        self.version
    }

    pub fn options(&self) -> &TouchstoneOptions {
        &self.options
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn noise(&self) -> Option<&[NoiseRecord]> {
        self.noise.as_deref()
    }

    /// Reference impedance for every port.
    pub fn reference_impedances(&self) -> Vec<f64> {
        match &self.reference {
            Some(reference) if reference.len() == self.rank => reference.clone(),
            Some(reference) if reference.len() == 1 => vec![reference[0]; self.rank],
            _ => vec![self.options.resistance; self.rank],
        }
    }

    pub fn new(path: &Path) -> Result<Self, ParseError> {
        let rank = rank_from_extension(path)?;
        let file = File::open(path)?;
        let mut touchstone = Touchstone::from_reader(BufReader::new(file), rank)?;
        touchstone.filename = path.display().to_string();
        Ok(touchstone)
    }

    /// Parses Touchstone content from any buffered reader. `rank` is the
    /// port count implied by the file name, if any.
    pub fn from_reader<R: BufRead>(reader: R, rank: Option<usize>) -> Result<Self, ParseError> {
        let mut touchstone = Touchstone::default();
        let mut rank = rank;

        // Main parse loop
        let mut options_read = false;
        let mut reference_pending = false;
        let mut section = Section::Network;
        let mut pending: Vec<f64> = vec![];
        let mut records: Vec<Vec<f64>> = vec![];
        let mut noise: Vec<NoiseRecord> = vec![];

        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line_buf = line?;
            let mut line = line_buf.as_str();

            if let Some(idx) = line.find('!') {
                if !options_read {
                    touchstone.comments.push(line[idx + 1..].trim().to_owned());
                }
                line = &line[..idx];
            }
            let line = line.trim().to_ascii_lowercase();
            if line.is_empty() {
                continue;
            }

            if reference_pending && !line.starts_with('[') {
                touchstone.reference = Some(parse_values(&line, line_no)?);
                reference_pending = false;
                continue;
            }

            if line.starts_with('[') {
                let captures = keyword_regex().captures(&line).ok_or_else(|| ParseError::InvalidKeyword {
                    line: line_no,
                    keyword: line.clone(),
                })?;
                let keyword = captures[1].trim().to_owned();
                let value = captures[2].trim();
                let invalid = || ParseError::InvalidKeyword {
                    line: line_no,
                    keyword: keyword.clone(),
                };
                match keyword.as_str() {
                    "version" => {
                        touchstone.version = match value {
                            "1.0" | "1.1" => TouchstoneVersion::One,
                            "2.0" | "2.1" => TouchstoneVersion::Two,
                            _ => return Err(invalid()),
                        }
                    }
                    "number of ports" => {
                        let ports = value.parse::<usize>().map_err(|_| invalid())?;
                        if rank.map_or(false, |r| r != ports) {
                            return Err(invalid());
                        }
                        touchstone.num_ports = Some(ports);
                        rank = Some(ports);
                    }
                    "two-port data order" => {
                        touchstone.two_port_order = match value {
                            "12_21" => TwoPortOrder::TwelveTwentyOne,
                            "21_12" => TwoPortOrder::TwentyOneTwelve,
                            _ => return Err(invalid()),
                        }
                    }
                    "number of frequencies" => {
                        touchstone.num_freq_points = Some(value.parse().map_err(|_| invalid())?);
                    }
                    "number of noise frequencies" => {
                        touchstone.num_noise_freq_points = Some(value.parse().map_err(|_| invalid())?);
                    }
                    "reference" => {
                        if value.is_empty() {
                            reference_pending = true;
                        } else {
                            touchstone.reference = Some(parse_values(value, line_no)?);
                        }
                    }
                    "matrix format" => {
                        if value != "full" {
                            return Err(ParseError::Unsupported(format!("matrix format {}", value)));
                        }
                    }
                    // Explicitly marks the beginning of network data
                    "network data" => section = Section::Network,
                    "noise data" => section = Section::Noise,
                    "end" => break,
                    other => debug!(keyword = other, line = line_no, "ignoring touchstone keyword"),
                }
            } else if line.starts_with('#') {
                if options_read {
                    debug!(line = line_no, "ignoring repeated option line");
                    continue;
                }
                parse_options_line(&line, &mut touchstone.options)?;
                options_read = true;
            } else {
                let rank = rank.ok_or(ParseError::MissingPorts)?;
                let values = parse_values(&line, line_no)?;
                let unit = touchstone.options.unit;

                // 2-port noise data starts where the frequency stops increasing
                if section == Section::Network
                    && rank == 2
                    && pending.is_empty()
                    && records.last().map_or(false, |last| values[0] <= last[0])
                {
                    debug!(line = line_no, "network data ended, reading noise parameters");
                    section = Section::Noise;
                }

                match section {
                    Section::Noise => {
                        if values.len() != 5 {
                            return Err(ParseError::ShapeMismatch {
                                expected: 5,
                                actual: values.len(),
                            });
                        }
                        noise.push(NoiseRecord {
                            freq: unit * values[0],
                            nf_min_db: values[1],
                            gamma_opt: Complex::from_polar(values[2], values[3].to_radians()),
                            rn: values[4],
                        });
                    }
                    Section::Network => {
                        let record_len = 2 * rank * rank + 1;
                        pending.extend(values);
                        while pending.len() >= record_len {
                            records.push(pending.drain(..record_len).collect());
                        }
                    }
                }
            }
        }

        let rank = rank.ok_or(ParseError::MissingPorts)?;
        if !pending.is_empty() {
            return Err(ParseError::ShapeMismatch {
                expected: 2 * rank * rank + 1,
                actual: pending.len(),
            });
        }
        if let Some(expected) = touchstone.num_freq_points {
            if expected != records.len() {
                return Err(ParseError::ShapeMismatch {
                    expected,
                    actual: records.len(),
                });
            }
        }
        if let Some(expected) = touchstone.num_noise_freq_points {
            if expected != noise.len() {
                return Err(ParseError::ShapeMismatch {
                    expected,
                    actual: noise.len(),
                });
            }
        }

        touchstone.rank = rank;
        let unit = touchstone.options.unit;
        let format = touchstone.options.param_format;
        let swap_off_diagonal = rank == 2 && touchstone.two_port_order == TwoPortOrder::TwentyOneTwelve;
        let mut s_params = Array3::<Complex<f64>>::zeros((records.len(), rank, rank));
        for (f_idx, record) in records.iter().enumerate() {
            touchstone.freqs.push(unit * record[0]);
            for (k, pair) in record[1..].chunks(2).enumerate() {
                let (mut i, mut j) = (k / rank, k % rank);
                if swap_off_diagonal {
                    std::mem::swap(&mut i, &mut j);
                }
                s_params[[f_idx, i, j]] = format.to_complex(pair[0], pair[1]);
            }
        }
        debug!(shape = ?s_params.dim(), "parsed touchstone network data");
        touchstone.s_params = s_params;
        if !noise.is_empty() {
            touchstone.noise = Some(noise);
        }
        Ok(touchstone)
    }
}

fn option_tokens(input: &str) -> IResult<&str, Vec<&str>> {
    preceded(
        pair(char('#'), space0),
        separated_list0(space1, take_till1(|c: char| c.is_whitespace())),
    )(input)
}

fn parse_options_line(line: &str, options: &mut TouchstoneOptions) -> Result<(), ParseError> {
    let (_, split_line) =
        option_tokens(line.trim()).map_err(|_| ParseError::InvalidOption(line.to_owned()))?;
    let mut entries = split_line.iter();
    while let Some(entry) = entries.next() {
        match *entry {
            unit if unit.ends_with("hz") => options.unit = unit.parse()?,
            "db" | "ma" | "ri" => options.param_format = entry.parse()?,
            "s" | "y" | "z" | "h" | "g" => options.param_type = entry.parse()?,
            "r" => {
                options.resistance = entries
                    .next()
                    .and_then(|r| r.parse::<f64>().ok())
                    .ok_or_else(|| ParseError::InvalidOption(line.to_owned()))?
            }
            _ => return Err(ParseError::InvalidOption(line.to_owned())),
        }
    }
    Ok(())
}

impl fmt::Debug for Touchstone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Touchstone")
            .field("filename", &self.filename)
            .field("version", &self.version)
            .field("options", &self.options)
            .field("num_ports", &self.num_ports)
            .field("num_freq_points", &self.num_freq_points)
            .field("num_noise_freq_points", &self.num_noise_freq_points)
            .field("reference", &self.reference)
            .field("rank", &self.rank)
            .field("freqs", &self.freqs.len())
            .field("s_params", &self.s_params.shape())
            .field("noise", &self.noise.as_ref().map(Vec::len))
            .field("comments", &self.comments)
            .finish()
    }
}
