/*
    volren_lib
    Author: Michal Majer
    Date: 2022-05-05
*/

//! Benchmark categories

pub mod animation;
pub mod frame;
