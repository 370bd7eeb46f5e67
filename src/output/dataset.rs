use crate::model::{BookRow, ScrapedBook};
use crate::output::{OutputError, OutputResult};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Column order of the dataset file
pub const COLUMNS: [&str; 16] = [
    "id",
    "categoria",
    "url_categoria",
    "titulo",
    "link_livro",
    "url_imagem",
    "descricao_produto",
    "qtde_estrelas",
    "upc",
    "tipo_produto",
    "moeda",
    "preco_excl_tax",
    "preco_incl_tax",
    "imposto",
    "disponibilidade_produto",
    "numero_de_reviews",
];

const DELIMITER: u8 = b';';

/// The final table: one row per extracted record, ids assigned by position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    rows: Vec<BookRow>,
}

impl Dataset {
    /// Assigns ids 0..n in the order the records arrive
    ///
    /// No deduplication, sorting or validation happens here.
    pub fn assemble(records: Vec<ScrapedBook>) -> Self {
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(id, book)| BookRow::new(id as u64, book))
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[BookRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes the table, header included even when there are no rows
    ///
    /// Rows go to a `.partial` sibling which is renamed over `path` once
    /// complete, so readers never see a half-written table. Missing parent
    /// directories are created.
    pub fn write(&self, path: &Path) -> OutputResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let partial = partial_path(path)?;
        if let Err(e) = self.write_rows(&partial) {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        fs::rename(&partial, path)?;

        tracing::info!("Wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    fn write_rows(&self, path: &Path) -> OutputResult<()> {
        let file = File::create(path)?;
        let mut writer = WriterBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .from_writer(file);

        writer.write_record(COLUMNS)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Reads a dataset file; a missing or empty file is "no data"
pub fn read_dataset(path: &Path) -> OutputResult<Vec<BookRow>> {
    if !path.exists() || fs::metadata(path)?.len() == 0 {
        tracing::debug!("No dataset at {}", path.display());
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new().delimiter(DELIMITER).from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<BookRow>, _>>()?;
    Ok(rows)
}

fn partial_path(path: &Path) -> OutputResult<PathBuf> {
    let mut name = path
        .file_name()
        .ok_or_else(|| OutputError::InvalidPath(path.display().to_string()))?
        .to_os_string();
    name.push(".partial");
    Ok(path.with_file_name(name))
}
