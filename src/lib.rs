//! Themis 日记 MCP 服务核心库
//! 通过 MCP 工具 `getRecentEntries` 读取日记目录中最近 N 天的条目。

pub mod config;
pub mod error;
pub mod model;
pub mod reader;
pub mod scanner;
pub mod diary;
pub mod mcp;
