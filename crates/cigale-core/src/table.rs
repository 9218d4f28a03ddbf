//! Columnar model tables read from and written to FITS binary tables.

use crate::domain::{CigaleError, CigaleResult};
use fitsio::FitsFile;
use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::tables::{ColumnDataType, ColumnDescription};
use std::path::Path;
use tracing::debug;

pub const TABLE_EXTNAME: &str = "MODELS";

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            Self::Float(values) => values.len(),
            Self::Int(values) => values.len(),
            Self::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Float,
    Int,
    Text,
    Unsupported,
}

fn column_kind(typ: &ColumnDataType) -> ColumnKind {
    match typ {
        ColumnDataType::Float | ColumnDataType::Double => ColumnKind::Float,
        ColumnDataType::Byte
        | ColumnDataType::SignedByte
        | ColumnDataType::Short
        | ColumnDataType::UnsignedShort
        | ColumnDataType::Int
        | ColumnDataType::Long
        | ColumnDataType::UnsignedLong
        | ColumnDataType::LongLong
        | ColumnDataType::UnsignedLongLong => ColumnKind::Int,
        ColumnDataType::String | ColumnDataType::Text => ColumnKind::Text,
        ColumnDataType::Logical | ColumnDataType::Bit => ColumnKind::Unsupported,
    }
}

/// Simulated models, one row per model, columns addressed by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelTable {
    columns: Vec<Column>,
}

impl ModelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_column(&mut self, name: impl Into<String>, data: ColumnData) -> CigaleResult<()> {
        let name = name.into();
        if self.column(&name).is_some() {
            return Err(CigaleError::InvalidTable(format!(
                "column '{}' is already present",
                name
            )));
        }
        if !self.columns.is_empty() && data.len() != self.num_rows() {
            return Err(CigaleError::InvalidTable(format!(
                "column '{}' has {} rows, table has {}",
                name,
                data.len(),
                self.num_rows()
            )));
        }
        self.columns.push(Column { name, data });
        Ok(())
    }

    pub fn with_column(mut self, name: impl Into<String>, data: ColumnData) -> CigaleResult<Self> {
        self.push_column(name, data)?;
        Ok(self)
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |column| column.data.len())
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| &column.data)
    }

    /// Numeric column as floats; integer columns are widened.
    pub fn float_column(&self, name: &str) -> CigaleResult<Vec<f64>> {
        match self.column(name) {
            Some(ColumnData::Float(values)) => Ok(values.clone()),
            Some(ColumnData::Int(values)) => Ok(values.iter().map(|value| *value as f64).collect()),
            Some(ColumnData::Text(_)) => Err(CigaleError::InvalidTable(format!(
                "column '{}' holds text, expected numbers",
                name
            ))),
            None => Err(CigaleError::MissingColumn {
                column: name.to_string(),
            }),
        }
    }

    /// Narrows the table to `names`, in that order. Repeated names are kept once.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> CigaleResult<Self> {
        let mut selected = Self::new();
        for name in names {
            let name = name.as_ref();
            if selected.column(name).is_some() {
                continue;
            }
            let data = self
                .column(name)
                .ok_or_else(|| CigaleError::MissingColumn {
                    column: name.to_string(),
                })?;
            selected.columns.push(Column {
                name: name.to_string(),
                data: data.clone(),
            });
        }
        Ok(selected)
    }

    /// Loads every column of the first binary table found in the file.
    pub fn read_fits(path: impl AsRef<Path>) -> CigaleResult<Self> {
        let path = path.as_ref();
        let (mut fptr, hdu, layout) = open_first_table(path)?;
        let names = layout.iter().map(|(name, _)| name.clone()).collect::<Vec<_>>();
        read_layout_columns(path, &mut fptr, &hdu, &layout, &names)
    }

    /// Loads only `names`, in that order, from the first binary table.
    ///
    /// Columns that are not requested are never decoded, so their type does
    /// not matter.
    pub fn read_fits_columns<S: AsRef<str>>(
        path: impl AsRef<Path>,
        names: &[S],
    ) -> CigaleResult<Self> {
        let path = path.as_ref();
        let (mut fptr, hdu, layout) = open_first_table(path)?;
        read_layout_columns(path, &mut fptr, &hdu, &layout, names)
    }

    pub fn write_fits(&self, path: impl AsRef<Path>, overwrite: bool) -> CigaleResult<()> {
        let path = path.as_ref();
        if self.columns.is_empty() {
            return Err(CigaleError::InvalidTable(
                "cannot write a table without columns".to_string(),
            ));
        }
        if path.exists() && !overwrite {
            return Err(CigaleError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "file already exists"),
            ));
        }

        let fits_error = |source: fitsio::errors::Error| CigaleError::fits(path, source);

        let descriptions = self
            .columns
            .iter()
            .map(|column| match &column.data {
                ColumnData::Float(_) => ColumnDescription::new(column.name.as_str())
                    .with_type(ColumnDataType::Double)
                    .create(),
                ColumnData::Int(_) => ColumnDescription::new(column.name.as_str())
                    .with_type(ColumnDataType::LongLong)
                    .create(),
                ColumnData::Text(values) => {
                    let width = values.iter().map(String::len).max().unwrap_or(1).max(1);
                    ColumnDescription::new(column.name.as_str())
                        .with_type(ColumnDataType::String)
                        .that_repeats(width)
                        .create()
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(fits_error)?;

        let builder = FitsFile::create(path);
        let builder = if overwrite {
            builder.overwrite()
        } else {
            builder
        };
        let mut fptr = builder.open().map_err(fits_error)?;
        let hdu = fptr
            .create_table(TABLE_EXTNAME, &descriptions)
            .map_err(fits_error)?;

        for column in &self.columns {
            let name = column.name.as_str();
            match &column.data {
                ColumnData::Float(values) => hdu.write_col(&mut fptr, name, values),
                ColumnData::Int(values) => hdu.write_col(&mut fptr, name, values),
                ColumnData::Text(values) => hdu.write_col(&mut fptr, name, values),
            }
            .map_err(fits_error)?;
        }

        debug!(
            path = %path.display(),
            rows = self.num_rows(),
            columns = self.num_columns(),
            "wrote model table"
        );
        Ok(())
    }
}

type ColumnLayout = Vec<(String, ColumnKind)>;

fn open_first_table(path: &Path) -> CigaleResult<(FitsFile, FitsHdu, ColumnLayout)> {
    if !path.is_file() {
        return Err(CigaleError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let mut fptr = FitsFile::open(path).map_err(|source| CigaleError::fits(path, source))?;

    let mut hdu_index: usize = 0;
    loop {
        let Ok(hdu) = fptr.hdu(hdu_index) else {
            return Err(CigaleError::InvalidTable(format!(
                "'{}' does not contain a binary table",
                path.display()
            )));
        };
        if let HduInfo::TableInfo {
            column_descriptions,
            ..
        } = &hdu.info
        {
            let layout = column_descriptions
                .iter()
                .map(|description| {
                    (
                        description.name.clone(),
                        column_kind(&description.data_type.typ),
                    )
                })
                .collect::<Vec<_>>();
            return Ok((fptr, hdu, layout));
        }
        hdu_index += 1;
    }
}

fn read_layout_columns<S: AsRef<str>>(
    path: &Path,
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    layout: &[(String, ColumnKind)],
    names: &[S],
) -> CigaleResult<ModelTable> {
    let mut table = ModelTable::new();
    for name in names {
        let name = name.as_ref();
        if table.column(name).is_some() {
            continue;
        }
        let kind = layout
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| CigaleError::MissingColumn {
                column: name.to_string(),
            })?;

        let data = match kind {
            ColumnKind::Float => hdu.read_col::<f64>(fptr, name).map(ColumnData::Float),
            ColumnKind::Int => hdu.read_col::<i64>(fptr, name).map(ColumnData::Int),
            ColumnKind::Text => hdu.read_col::<String>(fptr, name).map(ColumnData::Text),
            ColumnKind::Unsupported => {
                return Err(CigaleError::InvalidTable(format!(
                    "column '{}' in '{}' has a logical or bit type",
                    name,
                    path.display()
                )));
            }
        }
        .map_err(|source| CigaleError::fits(path, source))?;
        table.push_column(name, data)?;
    }

    debug!(
        path = %path.display(),
        rows = table.num_rows(),
        columns = table.num_columns(),
        "loaded model table"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::{ColumnData, ModelTable, TABLE_EXTNAME};
    use crate::domain::CigaleError;
    use fitsio::FitsFile;
    use fitsio::tables::{ColumnDataType, ColumnDescription};
    use std::path::Path;
    use tempfile::TempDir;

    fn write_raw_table(
        path: &Path,
        columns: &[(&str, ColumnDataType)],
        f64_column: (&str, Vec<f64>),
    ) {
        let descriptions = columns
            .iter()
            .map(|(name, typ)| {
                ColumnDescription::new(*name)
                    .with_type(*typ)
                    .create()
                    .expect("column description should be valid")
            })
            .collect::<Vec<_>>();
        let mut fptr = FitsFile::create(path).open().expect("fits file should be created");
        let hdu = fptr
            .create_table(TABLE_EXTNAME, &descriptions)
            .expect("table should be created");
        hdu.write_col(&mut fptr, f64_column.0, &f64_column.1)
            .expect("column should be written");
    }

    fn sample_table() -> ModelTable {
        ModelTable::new()
            .with_column("id", ColumnData::Int(vec![0, 1, 2]))
            .and_then(|table| {
                table.with_column("hst.wfc.F555W", ColumnData::Float(vec![1.5, 2.5, 3.5]))
            })
            .and_then(|table| {
                table.with_column("stellar.m_star", ColumnData::Float(vec![1.0, 2.0, 4.0]))
            })
            .and_then(|table| {
                table.with_column(
                    "label",
                    ColumnData::Text(vec!["a".into(), "bb".into(), "ccc".into()]),
                )
            })
            .expect("sample table should be consistent")
    }

    #[test]
    fn select_keeps_requested_order() {
        let table = sample_table();
        let selected = table
            .select(&["stellar.m_star", "hst.wfc.F555W", "stellar.m_star"])
            .expect("columns exist");

        assert_eq!(
            selected.column_names(),
            vec!["stellar.m_star", "hst.wfc.F555W"]
        );
        assert_eq!(selected.num_rows(), 3);
    }

    #[test]
    fn select_reports_missing_column() {
        let error = sample_table()
            .select(&["hst.wfc.F555W", "sfh.age"])
            .expect_err("sfh.age is absent");
        assert!(matches!(error, CigaleError::MissingColumn { ref column } if column == "sfh.age"));
    }

    #[test]
    fn push_column_checks_row_count() {
        let mut table = sample_table();
        let error = table
            .push_column("short", ColumnData::Float(vec![1.0]))
            .expect_err("length mismatch should fail");
        assert_eq!(error.placeholder(), "RUN.INVALID_TABLE");

        let duplicate = table.push_column("id", ColumnData::Int(vec![5, 6, 7]));
        assert!(duplicate.is_err());
    }

    #[test]
    fn float_column_widens_integers() {
        let table = sample_table();
        assert_eq!(
            table.float_column("id").expect("id is numeric"),
            vec![0.0, 1.0, 2.0]
        );
        assert!(table.float_column("label").is_err());
    }

    #[test]
    fn fits_write_then_read_preserves_columns() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("models.fits");
        let table = sample_table();

        table.write_fits(&path, false).expect("table should be written");
        let loaded = ModelTable::read_fits(&path).expect("table should be read");

        assert_eq!(loaded.column_names(), table.column_names());
        assert_eq!(loaded.num_rows(), 3);
        assert_eq!(
            loaded.column("hst.wfc.F555W"),
            Some(&ColumnData::Float(vec![1.5, 2.5, 3.5]))
        );
        assert_eq!(
            loaded.float_column("id").expect("id is numeric"),
            vec![0.0, 1.0, 2.0]
        );
        assert_eq!(
            loaded.column("label"),
            Some(&ColumnData::Text(vec!["a".into(), "bb".into(), "ccc".into()]))
        );
    }

    #[test]
    fn write_respects_overwrite_flag() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("models.fits");
        let table = sample_table();

        table.write_fits(&path, false).expect("first write should succeed");
        assert!(table.write_fits(&path, false).is_err());

        let narrowed = table.select(&["hst.wfc.F555W"]).expect("column exists");
        narrowed.write_fits(&path, true).expect("overwrite should succeed");
        let loaded = ModelTable::read_fits(&path).expect("table should be read");
        assert_eq!(loaded.column_names(), vec!["hst.wfc.F555W"]);
    }

    #[test]
    fn reading_missing_file_fails_clearly() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = ModelTable::read_fits(temp.path().join("out/models-block-0.fits"))
            .expect_err("missing file should fail");
        assert_eq!(error.placeholder(), "IO.MISSING_FILE");
    }

    #[test]
    fn integer_columns_keep_full_64_bit_range() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("ids.fits");
        let table = ModelTable::new()
            .with_column("id", ColumnData::Int(vec![1, 5_000_000_000, -7]))
            .expect("column should be added");

        table.write_fits(&path, false).expect("table should be written");
        let loaded = ModelTable::read_fits(&path).expect("table should be read");

        assert_eq!(
            loaded.column("id"),
            Some(&ColumnData::Int(vec![1, 5_000_000_000, -7]))
        );
    }

    #[test]
    fn longlong_columns_load_as_integers() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("block.fits");
        let ids: Vec<i64> = vec![0, 9_007_199_254_740_993];
        {
            let descriptions = [ColumnDescription::new("id")
                .with_type(ColumnDataType::LongLong)
                .create()
                .expect("column description should be valid")];
            let mut fptr = FitsFile::create(&path).open().expect("fits file should be created");
            let hdu = fptr
                .create_table(TABLE_EXTNAME, &descriptions)
                .expect("table should be created");
            hdu.write_col(&mut fptr, "id", &ids)
                .expect("column should be written");
        }

        let loaded = ModelTable::read_fits(&path).expect("table should be read");
        assert_eq!(loaded.column("id"), Some(&ColumnData::Int(ids.clone())));

        let resaved = temp.path().join("resaved.fits");
        loaded.write_fits(&resaved, false).expect("table should be re-saved");
        let reloaded = ModelTable::read_fits(&resaved).expect("table should be read");
        assert_eq!(reloaded.column("id"), Some(&ColumnData::Int(ids)));
    }

    #[test]
    fn unrequested_logical_columns_do_not_block_loading() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("flags.fits");
        write_raw_table(
            &path,
            &[("x", ColumnDataType::Double), ("flag", ColumnDataType::Logical)],
            ("x", vec![1.0, 2.0]),
        );

        let selected = ModelTable::read_fits_columns(&path, &["x"]).expect("x should load");
        assert_eq!(selected.column_names(), vec!["x"]);
        assert_eq!(selected.column("x"), Some(&ColumnData::Float(vec![1.0, 2.0])));

        let error = ModelTable::read_fits_columns(&path, &["flag"])
            .expect_err("logical columns cannot be decoded");
        assert_eq!(error.placeholder(), "RUN.INVALID_TABLE");
        assert!(ModelTable::read_fits(&path).is_err());
    }

    #[test]
    fn selective_read_keeps_order_and_reports_missing_columns() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("models.fits");
        sample_table().write_fits(&path, false).expect("table should be written");

        let selected = ModelTable::read_fits_columns(&path, &["stellar.m_star", "id", "id"])
            .expect("columns exist");
        assert_eq!(selected.column_names(), vec!["stellar.m_star", "id"]);

        let error = ModelTable::read_fits_columns(&path, &["sfh.age"])
            .expect_err("sfh.age is absent");
        assert!(matches!(error, CigaleError::MissingColumn { ref column } if column == "sfh.age"));
    }
}
