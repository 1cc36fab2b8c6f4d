//! 共享类型定义模块

use serde::{Deserialize, Serialize};

use crate::shared::constants::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// 实体ID类型（由存储层分配）
pub type EntityId = i64;

/// 分类ID类型
pub type CategoryId = EntityId;

/// 商品ID类型
pub type ProductId = EntityId;

/// 用户ID类型
pub type UserId = EntityId;

/// 页码类型
pub type PageNumber = u32;

/// 页面大小类型
pub type PageSize = u32;

/// 分页参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationParams {
    pub page: PageNumber,
    pub size: PageSize,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationParams {
    /// 计算偏移量
    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.size as u64
    }
    
    /// 计算限制数量
    pub fn limit(&self) -> u64 {
        self.size as u64
    }
    
    /// 验证分页参数
    pub fn validate(&self) -> Result<(), String> {
        if self.page == 0 {
            return Err("页码必须大于0".to_string());
        }
        if self.size == 0 || self.size > MAX_PAGE_SIZE {
            return Err(format!("页面大小必须在1-{}之间", MAX_PAGE_SIZE));
        }
        Ok(())
    }
}

/// 分页响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationInfo,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, params: &PaginationParams, total_count: u64) -> Self {
        Self {
            data,
            pagination: PaginationInfo::new(params.page, params.size, total_count),
        }
    }
}

/// 分页信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub current_page: PageNumber,
    pub page_size: PageSize,
    pub total_count: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationInfo {
    pub fn new(current_page: PageNumber, page_size: PageSize, total_count: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_count.div_ceil(page_size as u64) as u32
        };
        let has_next = current_page < total_pages;
        let has_prev = current_page > 1;
        
        Self {
            current_page,
            page_size,
            total_count,
            total_pages,
            has_next,
            has_prev,
        }
    }
}
