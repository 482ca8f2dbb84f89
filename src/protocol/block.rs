use tokio::io::{AsyncRead, AsyncWrite};

use crate::column::{read_column, skip_column, write_column, Column};
use crate::error::{Error, Result};
use crate::types::parse_type;
use crate::wire::reader::ProtocolReader;
use crate::wire::writer::ProtocolWriter;

/// Per-block metadata, field-tagged on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub is_overflows: bool,
    pub bucket_num: i32,
}

impl Default for BlockInfo {
    fn default() -> Self {
        Self {
            is_overflows: false,
            bucket_num: -1,
        }
    }
}

/// One unit of columnar transfer: named, typed columns of equal length.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub info: BlockInfo,
    columns: Vec<(String, Column)>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |(_, col)| col.len())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.row_count() == 0
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, col)| (name.as_str(), col))
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, col)| col)
    }

    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index).map(|(_, col)| col)
    }

    /// Appends a column; all columns of a block must agree on length.
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        if let Some((_, first)) = self.columns.first() {
            if first.len() != column.len() {
                return Err(Error::Internal(format!(
                    "block columns disagree on row count: {} vs {}",
                    first.len(),
                    column.len()
                )));
            }
        }
        self.columns.push((name.into(), column));
        Ok(())
    }
}

/// Field tags of the block-info section.
const INFO_FIELD_END: u64 = 0;
const INFO_FIELD_OVERFLOWS: u64 = 1;
const INFO_FIELD_BUCKET: u64 = 2;

pub fn write_block<S>(w: &mut ProtocolWriter<S>, block: &Block) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    w.write_varint(INFO_FIELD_OVERFLOWS)?;
    w.write_bool(block.info.is_overflows)?;
    w.write_varint(INFO_FIELD_BUCKET)?;
    w.write_i32(block.info.bucket_num)?;
    w.write_varint(INFO_FIELD_END)?;

    w.write_varint(block.column_count() as u64)?;
    w.write_varint(block.row_count() as u64)?;
    for (name, column) in block.columns() {
        w.write_string(name)?;
        w.write_string(&column.type_info.full_name)?;
        write_column(w, &column.type_info, &column.data)?;
    }
    Ok(())
}

async fn read_block_info<S>(r: &mut ProtocolReader<S>) -> Result<BlockInfo>
where
    S: AsyncRead + Unpin + Send,
{
    let mut info = BlockInfo::default();
    loop {
        match r.read_varint().await? {
            INFO_FIELD_END => return Ok(info),
            INFO_FIELD_OVERFLOWS => info.is_overflows = r.read_bool().await?,
            INFO_FIELD_BUCKET => info.bucket_num = r.read_i32().await?,
            other => {
                return Err(Error::UnexpectedResponse(format!(
                    "unknown block-info field {other}"
                )))
            }
        }
    }
}

/// Reads one block, materialising every column. Columns whose names appear
/// in `skip_names` are decoded-and-dropped instead.
pub async fn read_block<S>(r: &mut ProtocolReader<S>, skip_names: &[&str]) -> Result<Block>
where
    S: AsyncRead + Unpin + Send,
{
    let info = read_block_info(r).await?;
    let column_count = r.read_varint().await? as usize;
    let row_count = r.read_varint().await? as usize;

    let mut block = Block {
        info,
        columns: Vec::with_capacity(column_count),
    };
    for _ in 0..column_count {
        let name = r.read_string().await?;
        let type_name = r.read_string().await?;
        let type_info = parse_type(&type_name)?;
        if skip_names.contains(&name.as_str()) {
            skip_column(r, &type_info, row_count).await?;
            continue;
        }
        let column = read_column(r, &type_info, row_count).await?;
        if column.len() != row_count {
            return Err(Error::UnexpectedResponse(format!(
                "column `{name}` produced {} rows, block declared {row_count}",
                column.len()
            )));
        }
        block.columns.push((name, column));
    }
    Ok(block)
}

/// Convenience constructor for insert paths: parses the declared types and
/// wraps the buffers into a block.
pub fn block_of(columns: Vec<(&str, &str, crate::column::ColumnData)>) -> Result<Block> {
    let mut block = Block::new();
    for (name, type_str, data) in columns {
        let type_info = parse_type(type_str)?;
        block.push_column(name, Column::new(type_info, data))?;
    }
    Ok(block)
}
