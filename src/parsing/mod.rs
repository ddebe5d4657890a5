pub mod transaction_structs;

use self::transaction_structs::{InputType, Transaction};
use crate::error::ParseError;
use serde_json::from_str;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

// applies the serde function on the loaded String content of the json
// and sets the input types of the parsed transaction
pub fn parse_json(str_content: &str) -> Result<Transaction, serde_json::Error> {
    let mut tx = from_str::<Transaction>(str_content)?;
    for txin in &mut tx.vin {
        InputType::fetch_type(txin);
    }
    Ok(tx)
}

// reads the json file at path into a String and parses it.
// returns: None for files without .json extension
fn parse_file_content(path: &Path) -> Result<Option<Transaction>, ParseError> {
    if path.extension().map_or(true, |ext| ext != "json") {
        debug!(path = %path.display(), "skipping file without json extension");
        return Ok(None);
    }
    let file_content = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match parse_json(&file_content) {
        Ok(tx) => Ok(Some(tx)),
        Err(source) => {
            warn!(path = %path.display(), "invalid json transaction");
            Err(ParseError::Json {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

// opens passed directory calls parse_file_content on each file
// returns: Vec of Transaction structs
pub fn parse_transactions_from_dir(directory_path: &Path) -> Result<Vec<Transaction>, ParseError> {
    let io_err = |source| ParseError::Io {
        path: directory_path.to_path_buf(),
        source,
    };
    let mut transactions: Vec<Transaction> = Vec::new();

    for file in fs::read_dir(directory_path).map_err(io_err)? {
        let dir_entry = file.map_err(io_err)?;
        if let Some(transaction) = parse_file_content(&dir_entry.path())? {
            transactions.push(transaction);
        }
    }
    debug!(count = transactions.len(), "parsed mempool transactions");
    Ok(transactions)
}
