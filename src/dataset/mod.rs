//! Training-time dataset preparation.
//!
//! Takes the raw time-indexed table, generates lag columns for the target,
//! fits the scaler pair, and reshapes everything into the `(window, target)`
//! tensors the sequence model trains on. The fitted scalers are the ones
//! persisted for serving; fitting anywhere else would break the forward /
//! inverse symmetry.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use ndarray::{Array1, Array2, Array3, Axis};

use crate::config::FeatureSchema;
use crate::scaler::{MinMaxScaler, ScalerPair};

/// In-memory time-indexed table of named numeric columns.
#[derive(Debug, Clone)]
pub struct Table {
    index: Vec<String>,
    columns: Vec<String>,
    data: Array2<f64>,
}

impl Table {
    pub fn new(index: Vec<String>, columns: Vec<String>, data: Array2<f64>) -> Result<Self> {
        if data.nrows() != index.len() || data.ncols() != columns.len() {
            bail!(
                "table shape {:?} does not match {} index entries and {} columns",
                data.shape(),
                index.len(),
                columns.len()
            );
        }
        Ok(Self {
            index,
            columns,
            data,
        })
    }

    /// Read a CSV whose first column is the time index and whose remaining
    /// columns are numeric. Rows are sorted by index.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;

        let headers = reader.headers()?.clone();
        if headers.len() < 2 {
            bail!("{} needs an index column and at least one value column", path.display());
        }
        let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut rows: Vec<(String, Vec<f64>)> = Vec::new();
        for record in reader.records() {
            let record = record?;
            let stamp = record
                .get(0)
                .ok_or_else(|| anyhow!("row without index value"))?
                .to_string();
            let values = record
                .iter()
                .skip(1)
                .map(|field| {
                    field
                        .parse::<f64>()
                        .with_context(|| format!("non-numeric value '{}' at {}", field, stamp))
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push((stamp, values));
        }
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        let index: Vec<String> = rows.iter().map(|(s, _)| s.clone()).collect();
        let flat: Vec<f64> = rows.into_iter().flat_map(|(_, v)| v).collect();
        let data = Array2::from_shape_vec((index.len(), columns.len()), flat)?;

        Self::new(index, columns, data)
    }

    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Result<Array1<f64>> {
        let pos = self
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| anyhow!("table has no column '{}'", name))?;
        Ok(self.data.index_axis(Axis(1), pos).to_owned())
    }
}

/// Append `col_(t-1) .. col_(t-num_lags)` shifted columns for each named
/// column and drop the leading rows that lack a full lag history.
pub fn add_lags(table: &Table, num_lags: usize, columns: &[&str]) -> Result<Table> {
    if table.num_rows() <= num_lags {
        bail!(
            "need more than {} rows to build {} lags, table has {}",
            num_lags,
            num_lags,
            table.num_rows()
        );
    }

    let mut out_columns = table.columns.to_vec();
    let mut lagged: Vec<Array1<f64>> = Vec::new();

    for name in columns {
        let series = table.column(name)?;
        for i in 1..=num_lags {
            out_columns.push(format!("{}_(t-{})", name, i));
            lagged.push(
                series
                    .slice(ndarray::s![num_lags - i..series.len() - i])
                    .to_owned(),
            );
        }
    }

    let n = table.num_rows() - num_lags;
    let mut data = Array2::zeros((n, out_columns.len()));
    for (j, _) in table.columns.iter().enumerate() {
        data.column_mut(j)
            .assign(&table.data.slice(ndarray::s![num_lags.., j]));
    }
    for (k, series) in lagged.iter().enumerate() {
        data.column_mut(table.columns.len() + k).assign(series);
    }

    Table::new(table.index[num_lags..].to_vec(), out_columns, data)
}

/// Paired `(window, target)` samples plus the scaler pair fit on them.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    x: Array3<f64>,
    y: Array2<f64>,
    scalers: ScalerPair,
}

impl DatasetBuilder {
    /// Split target from features, order features per the schema, fit and
    /// apply the scaler pair, and reshape for the sequence model.
    pub fn fit(table: &Table, schema: &FeatureSchema) -> Result<Self> {
        let n = table.num_rows();
        let num_lags = schema.num_lags();

        let targets = table
            .column(schema.target())
            .context("target column missing from lagged table")?;
        let target_matrix = targets.insert_axis(Axis(1));

        let mut features = Array2::zeros((n, num_lags));
        for (j, name) in schema.column_names().iter().enumerate() {
            let series = table
                .column(name)
                .with_context(|| format!("lag column '{}' missing from table", name))?;
            features.column_mut(j).assign(&series);
        }

        let mut input_scaler = MinMaxScaler::new();
        let mut output_scaler = MinMaxScaler::new();
        let scaled_x = input_scaler.fit_transform(&features)?;
        let scaled_y = output_scaler.fit_transform(&target_matrix)?;

        let x = scaled_x
            .into_shape_with_order((n, num_lags, 1))
            .context("reshaping feature matrix into windows")?;

        Ok(Self {
            x,
            y: scaled_y,
            scalers: ScalerPair::new(input_scaler, output_scaler),
        })
    }

    /// One sample per row of the lagged table.
    pub fn len(&self) -> usize {
        self.x.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `(window, target)` pair at `idx`, shaped `(num_lags, 1)` / `(1,)`.
    pub fn get(&self, idx: usize) -> (Array2<f64>, Array1<f64>) {
        (
            self.x.index_axis(Axis(0), idx).to_owned(),
            self.y.index_axis(Axis(0), idx).to_owned(),
        )
    }

    pub fn windows(&self) -> &Array3<f64> {
        &self.x
    }

    pub fn targets(&self) -> &Array2<f64> {
        &self.y
    }

    /// The scalers fit on this dataset, to be persisted alongside it.
    pub fn scalers(&self) -> &ScalerPair {
        &self.scalers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnOrder, FeatureSchema};

    fn price_table(n: usize) -> Table {
        let index: Vec<String> = (0..n).map(|i| format!("2024-01-{:02}", i + 1)).collect();
        let prices: Vec<f64> = (0..n).map(|i| 50.0 + i as f64).collect();
        let data = Array2::from_shape_vec((n, 1), prices).unwrap();
        Table::new(index, vec!["pbr".to_string()], data).unwrap()
    }

    #[test]
    fn test_add_lags_shapes_and_values() {
        let table = price_table(10);
        let lagged = add_lags(&table, 7, &["pbr"]).unwrap();

        assert_eq!(lagged.num_rows(), 3);
        assert_eq!(lagged.columns().len(), 8);

        // row 0 is day 8: pbr = 57, pbr_(t-1) = 56, pbr_(t-7) = 50
        assert_eq!(lagged.column("pbr").unwrap()[0], 57.0);
        assert_eq!(lagged.column("pbr_(t-1)").unwrap()[0], 56.0);
        assert_eq!(lagged.column("pbr_(t-7)").unwrap()[0], 50.0);
    }

    #[test]
    fn test_add_lags_needs_enough_rows() {
        let table = price_table(5);
        assert!(add_lags(&table, 7, &["pbr"]).is_err());
    }

    #[test]
    fn test_builder_len_and_sample_shapes() {
        let table = price_table(20);
        let lagged = add_lags(&table, 7, &["pbr"]).unwrap();
        let schema = FeatureSchema::new("pbr", 7, ColumnOrder::OldestFirst);

        let dataset = DatasetBuilder::fit(&lagged, &schema).unwrap();
        assert_eq!(dataset.len(), lagged.num_rows());

        let (window, target) = dataset.get(0);
        assert_eq!(window.shape(), &[7, 1]);
        assert_eq!(target.shape(), &[1]);
    }

    #[test]
    fn test_builder_scales_into_unit_range() {
        let table = price_table(20);
        let lagged = add_lags(&table, 7, &["pbr"]).unwrap();
        let schema = FeatureSchema::new("pbr", 7, ColumnOrder::OldestFirst);

        let dataset = DatasetBuilder::fit(&lagged, &schema).unwrap();
        for &v in dataset.windows().iter() {
            assert!((-1.0..=1.0).contains(&v));
        }
        for &v in dataset.targets().iter() {
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_builder_window_order_follows_schema() {
        let table = price_table(20);
        let lagged = add_lags(&table, 7, &["pbr"]).unwrap();

        let oldest = DatasetBuilder::fit(
            &lagged,
            &FeatureSchema::new("pbr", 7, ColumnOrder::OldestFirst),
        )
        .unwrap();
        let recent = DatasetBuilder::fit(
            &lagged,
            &FeatureSchema::new("pbr", 7, ColumnOrder::MostRecentFirst),
        )
        .unwrap();

        // same values, mirrored sequence order
        let (w_old, _) = oldest.get(0);
        let (w_new, _) = recent.get(0);
        for t in 0..7 {
            assert_eq!(w_old[[t, 0]], w_new[[6 - t, 0]]);
        }
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("petro.csv");
        std::fs::write(
            &path,
            "date,pbr,usd\n2024-01-02,51.0,4.9\n2024-01-01,50.0,5.0\n",
        )
        .unwrap();

        let table = Table::from_csv(&path).unwrap();
        assert_eq!(table.num_rows(), 2);
        // rows come back index-sorted
        assert_eq!(table.column("pbr").unwrap()[0], 50.0);
        assert_eq!(table.column("usd").unwrap()[1], 4.9);
    }
}
