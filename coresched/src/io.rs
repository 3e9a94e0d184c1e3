use crate::utils::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

/// One buffer as read from an external liveness dump, before it is given
/// an arena handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferRow {
    pub name:  String,
    pub start: Step,
    pub end:   Step,
    pub size:  Bytes,
}

/// Defines the interface for reading buffer sets from outside the
/// compiler. The in-process path goes through [`liveness`] instead; this
/// exists for the CLI and for replaying dumps from other allocators.
///
/// Users can implement their own sources as needed.
pub trait ItemSource {
    /// Either a set of rows is successfully returned, or some arbitrary
    /// type that implements [`std::error::Error`].
    fn read_rows(&self) -> Result<Vec<BufferRow>, Box<dyn std::error::Error>>;
}

/// We adopt [`minimalloc`'s CSV](https://github.com/google/minimalloc)
/// column layout, `id,start,end,size`, as the most standard format.
pub struct LivenessCsv {
    pub path: PathBuf,
}

impl LivenessCsv {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ItemSource for LivenessCsv {
    fn read_rows(&self) -> Result<Vec<BufferRow>, Box<dyn std::error::Error>> {
        let fd = File::open(self.path.as_path())?;

        parse_csv(BufReader::new(fd))
    }
}

/// Parses the CSV off any buffered reader, so tests can feed in-memory
/// strings.
pub fn parse_csv<R: BufRead>(reader: R) -> Result<Vec<BufferRow>, Box<dyn std::error::Error>> {
    let mut res = vec![];
    // First line is the header!
    for line in reader.lines().skip(1) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split(',');
        let name = match fields.next() {
            Some(f) => f.trim().to_string(),
            None => return Err(format!("short CSV line: {line:?}").into()),
        };
        let mut num = || -> Result<usize, Box<dyn std::error::Error>> {
            match fields.next() {
                Some(f) => Ok(f.trim().parse::<usize>()?),
                None => Err(format!("short CSV line: {line:?}").into()),
            }
        };
        let (start, end, size) = (num()?, num()?, num()?);
        res.push(BufferRow {
            name,
            start,
            end,
            size,
        });
    }

    Ok(res)
}

/// Registers every row in `arena` and spawns the matching items, in row
/// order.
pub fn rows_to_items(rows: Vec<BufferRow>, arena: &mut BufferArena) -> Vec<Item> {
    rows.into_iter()
        .map(|row| {
            let id = arena.add(row.name, row.size, StorageClass::Scratch);
            Item {
                id,
                size: row.size,
                // Built raw: external rows may be ill-formed, and the
                // problem gatekeeper is where they get rejected.
                life: Lifetime {
                    start: row.start,
                    end:   row.end,
                },
            }
        })
        .collect()
}
