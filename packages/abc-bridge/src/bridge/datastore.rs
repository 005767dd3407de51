//! Per-account encrypted key/value store.
//!
//! Values are synced and backed up by the native layer; the bridge only
//! forwards. Keys live in named folders.

use serde_json::json;

use super::adapter::{CallResult, NativeCallAdapter};
use super::native::NativeMethod;

/// Folder/key/value storage bound to one account.
#[derive(Clone)]
pub struct DataStore {
    adapter: NativeCallAdapter,
}

impl DataStore {
    pub(crate) fn new(adapter: NativeCallAdapter) -> Self {
        Self { adapter }
    }

    /// Store `value` under `folder/key`.
    pub fn write<F>(&self, folder: &str, key: &str, value: &str, done: F)
    where
        F: FnOnce(CallResult<()>) + Send + 'static,
    {
        self.adapter.call_unit(
            NativeMethod::DataWrite,
            vec![json!(folder), json!(key), json!(value)],
            done,
        );
    }

    /// Read the value stored under `folder/key`.
    ///
    /// A missing key is reported by the native layer as an error.
    pub fn read<F>(&self, folder: &str, key: &str, done: F)
    where
        F: FnOnce(CallResult<String>) + Send + 'static,
    {
        self.adapter
            .call_value(NativeMethod::DataRead, vec![json!(folder), json!(key)], done);
    }

    /// Remove one key.
    pub fn remove_key<F>(&self, folder: &str, key: &str, done: F)
    where
        F: FnOnce(CallResult<()>) + Send + 'static,
    {
        self.adapter
            .call_unit(NativeMethod::DataRemoveKey, vec![json!(folder), json!(key)], done);
    }

    /// Remove a folder and every key in it.
    pub fn remove_folder<F>(&self, folder: &str, done: F)
    where
        F: FnOnce(CallResult<()>) + Send + 'static,
    {
        self.adapter
            .call_unit(NativeMethod::DataRemoveFolder, vec![json!(folder)], done);
    }

    /// List the keys of a folder.
    pub fn list_keys<F>(&self, folder: &str, done: F)
    where
        F: FnOnce(CallResult<Vec<String>>) + Send + 'static,
    {
        self.adapter
            .call_value(NativeMethod::DataListKeys, vec![json!(folder)], done);
    }
}
