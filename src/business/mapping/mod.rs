//! 实体与API数据传输对象之间的映射
//!
//! 每对实体/DTO 都有手写的 `to_api_shape` 和 `to_entity`，只在仓储层边界调用。
//! `to_entity` 负责必填字段校验，失败时返回可直接展示给调用方的说明。

pub mod category;
pub mod product;
pub mod user;

pub use category::{CategoryDto, CreateCategoryDto, UpdateCategoryDto};
pub use product::{CreateProductDto, ProductDto, PurchaseDto, UpdateProductDto};
pub use user::{CreateUserDto, LoginResponseDto, UpdateUserDto, UserDto, UserLoginDto};
