//! Circuits and checks shared by the integration tests

#![allow(dead_code)]

use std::fmt::Write;

use circdd::{Model, ModelBuilder, VarNo};
use circdd_parser::load_file::load_str;

pub fn parse(src: &str) -> Vec<Model> {
    load_str(src, "test.blif").expect("test input must parse")
}

fn input_list(s: &mut String, n: usize) {
    s.push_str(".inputs");
    for i in 0..n {
        write!(s, " a{i}").unwrap();
    }
    for i in 0..n {
        write!(s, " b{i}").unwrap();
    }
    s.push_str(" c0\n");
}

/// Ripple-carry adder over `a0..`, `b0..` and the carry-in `c0`
pub fn adder(n: usize) -> String {
    let mut s = format!(".model adder{n}\n");
    input_list(&mut s, n);
    s.push_str(".outputs");
    for i in 0..n {
        write!(s, " s{i}").unwrap();
    }
    writeln!(s, " c{n}").unwrap();
    for i in 0..n {
        writeln!(s, ".names a{i} b{i} t{i}\n10 1\n01 1").unwrap();
        writeln!(s, ".names t{i} c{i} s{i}\n10 1\n01 1").unwrap();
        writeln!(s, ".names a{i} b{i} t{i} c{i} c{}\n11-- 1\n--11 1", i + 1).unwrap();
    }
    s.push_str(".end\n");
    s
}

/// Parity of the adder inputs, and the conjunction of `a_i ≡ b_i` (with
/// `c0` ignored)
pub fn parity(n: usize) -> String {
    let mut s = format!(".model parity{n}\n");
    input_list(&mut s, n);
    s.push_str(".outputs p e\n");
    let mut prev = "c0".to_string();
    for (k, x) in ["a", "b"].iter().enumerate() {
        for i in 0..n {
            let next = format!("p{}", k * n + i);
            writeln!(s, ".names {prev} {x}{i} {next}\n10 1\n01 1").unwrap();
            prev = next;
        }
    }
    writeln!(s, ".names {prev} p\n1 1").unwrap();
    s.push_str(".names");
    for i in 0..n {
        write!(s, " a{i} b{i}").unwrap();
    }
    s.push_str(" e\n");
    // OFF-set: two rows per pair that differs
    for i in 0..n {
        let mut plane = vec!['-'; 2 * n];
        plane[2 * i] = '1';
        plane[2 * i + 1] = '0';
        let row: String = plane.iter().collect();
        writeln!(s, "{row} 0").unwrap();
        plane[2 * i] = '0';
        plane[2 * i + 1] = '1';
        let row: String = plane.iter().collect();
        writeln!(s, "{row} 0").unwrap();
    }
    s.push_str(".end\n");
    s
}

pub fn assignment(bits: u32, num_vars: VarNo) -> Vec<bool> {
    (0..num_vars).map(|i| bits & (1 << i) != 0).collect()
}

/// Check the outputs of a built [`adder()`] for all input combinations
pub fn check_adder(builder: &ModelBuilder, n: usize) {
    let forest = builder.engine().unwrap();
    let num_vars = builder.num_vars();
    for bits in 0..1u32 << (2 * n + 1) {
        let asg = assignment(bits, num_vars);
        let a = bits & ((1 << n) - 1);
        let b = (bits >> n) & ((1 << n) - 1);
        let c = bits >> (2 * n);
        let sum = a + b + c;
        for i in 0..n {
            let out = builder.output(&format!("s{i}")).unwrap();
            assert_eq!(forest.eval(out, &asg), sum & (1 << i) != 0, "s{i} at {bits:b}");
        }
        let carry = builder.output(&format!("c{n}")).unwrap();
        assert_eq!(forest.eval(carry, &asg), sum >> n != 0, "carry at {bits:b}");
    }
}

/// Check the outputs of a built [`parity()`] for all input combinations
pub fn check_parity(builder: &ModelBuilder, n: usize) {
    let forest = builder.engine().unwrap();
    let num_vars = builder.num_vars();
    let p = builder.output("p").unwrap();
    let e = builder.output("e").unwrap();
    for bits in 0..1u32 << (2 * n + 1) {
        let asg = assignment(bits, num_vars);
        assert_eq!(forest.eval(p, &asg), bits.count_ones() % 2 == 1, "p at {bits:b}");
        let a = bits & ((1 << n) - 1);
        let b = (bits >> n) & ((1 << n) - 1);
        assert_eq!(forest.eval(e, &asg), a == b, "e at {bits:b}");
    }
}
