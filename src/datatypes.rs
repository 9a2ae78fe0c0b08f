/// Data types of table columns statistics can be collected for.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum DataType {
    Bool,
    Int32,
    Int64,
    Float64,
    Date,
    DateTime,
    String,
}

impl DataType {
    /// Returns `true` if values of this type are numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int32 | DataType::Int64 | DataType::Float64)
    }
}
