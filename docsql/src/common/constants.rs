// doc constants
pub const DOC_ID: &str = "id";
pub const FIELD_SEPARATOR: &str = ".";
pub const OPERATOR_PREFIX: &str = "$";

// table layout constants
pub const ROW_ID_COLUMN: &str = "id";
pub const DOC_COLUMN: &str = "doc";

// group constants
pub const GROUP_ID: &str = "_id";

// pagination constants
pub const DEFAULT_PAGE_SIZE: u64 = 20;
