//! Criteria for [`crate::ToolRegistry::find`].

#[derive(Debug, Clone, Default)]
pub struct FindCriteria {
    pub category: Option<String>,
    pub capability: Option<String>,
    pub keywords: Vec<String>,
    pub input_type: Option<String>,
    pub output_type: Option<String>,
}

impl FindCriteria {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.capability.is_none()
            && self.keywords.is_empty()
            && self.input_type.is_none()
            && self.output_type.is_none()
    }
}
