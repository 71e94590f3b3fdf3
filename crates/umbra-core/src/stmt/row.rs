use super::Value;

use indexmap::IndexMap;

/// An ordered mapping of column names to values.
///
/// Rows are used both as write payloads handed to the database and as the
/// result representation handed back. Iteration order is insertion order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Row {
    fields: IndexMap<String, Value>,
}

/// Builds a [`Row`] from `name => value` pairs.
///
/// ```
/// use umbra_core::row;
///
/// let row = row! {
///     "id" => 1,
///     "title" => "morning pages",
/// };
/// assert_eq!(row.get("id"), Some(&1.into()));
/// ```
#[macro_export]
macro_rules! row {
    () => { $crate::stmt::Row::new() };
    ( $( $name:expr => $value:expr ),+ $(,)? ) => {{
        let mut row = $crate::stmt::Row::new();
        $( row.insert($name, $value); )+
        row
    }};
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    /// Removes and returns the named field.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|name| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl std::ops::Index<&str> for Row {
    type Output = Value;

    #[track_caller]
    fn index(&self, name: &str) -> &Value {
        match self.fields.get(name) {
            Some(value) => value,
            None => panic!("no field `{name}` in row; row={self:#?}"),
        }
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
