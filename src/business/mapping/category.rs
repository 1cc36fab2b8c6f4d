//! 分类映射

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::business::domain::Category;
use crate::shared::utils::validation::required;

/// 分类信息（API响应）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDto {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// 创建分类请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCategoryDto {
    pub name: Option<String>,
}

/// 更新分类请求（字段与创建相同）
pub type UpdateCategoryDto = CreateCategoryDto;

pub fn to_api_shape(category: &Category) -> CategoryDto {
    CategoryDto {
        id: category.id,
        name: category.name.clone(),
        created_at: category.created_at,
    }
}

/// 转换为未持久化的实体（ID由存储层分配）
pub fn to_entity(dto: &CreateCategoryDto, now: DateTime<Utc>) -> Result<Category, String> {
    let name = required(dto.name.as_deref()).ok_or("分类名称不能为空")?;
    if name.chars().count() > 100 {
        return Err("分类名称不能超过100个字符".to_string());
    }

    Ok(Category {
        id: 0,
        name,
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_entity_trims_name() {
        let dto = CreateCategoryDto { name: Some("  Libros ".to_string()) };
        let category = to_entity(&dto, Utc::now()).unwrap();
        assert_eq!(category.name, "Libros");
        assert_eq!(category.id, 0);
    }

    #[test]
    fn test_to_entity_requires_name() {
        assert!(to_entity(&CreateCategoryDto::default(), Utc::now()).is_err());
        assert!(to_entity(&CreateCategoryDto { name: Some("  ".to_string()) }, Utc::now()).is_err());
    }

    #[test]
    fn test_to_api_shape() {
        let now = Utc::now();
        let category = Category { id: 3, name: "Juguetes".to_string(), created_at: now };
        assert_eq!(
            to_api_shape(&category),
            CategoryDto { id: 3, name: "Juguetes".to_string(), created_at: now }
        );
    }
}
