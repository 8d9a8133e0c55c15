#![forbid(unsafe_code)]

use motion_core::ids::CategoryId;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListMotionsRequest {
    pub category: Option<CategoryId>,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub prefix: String,
}
