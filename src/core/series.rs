use crate::core::aggregate::Bucket;

/// Index-aligned labels and values, ready for display.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Series {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels.iter().map(String::as_str).zip(self.values.iter().copied())
    }
}

impl FromIterator<(String, f64)> for Series {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        let (labels, values) = iter.into_iter().unzip();
        Self { labels, values }
    }
}

impl From<Vec<Bucket>> for Series {
    fn from(buckets: Vec<Bucket>) -> Self {
        buckets.into_iter().map(|bucket| (bucket.label, bucket.total)).collect()
    }
}
