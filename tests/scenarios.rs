//! Cross-module integration tests for the testable scenarios: build a
//! symbolic instruction stream, assemble it, run it, and check observable
//! effects on host memory or the value stack.

use stackvm::{Address, AstNode, Lexer, OpCode, Parser, ProgramImage, Value, Vm};
use stackvm_asm::{assemble, StreamElement};

fn op(o: OpCode) -> StreamElement {
    StreamElement::Op(o)
}

fn val(v: f64) -> StreamElement {
    StreamElement::Value(Value::from_f64(v))
}

// Scenario S1.
#[test]
fn s1_arithmetic_writes_through_host_address() {
    let mut out: i64 = 0;
    let out_addr = Address::from_mut_ptr(&mut out as *mut i64);

    let mut image = ProgramImage::new();
    let elements = vec![
        op(OpCode::LoadValConst),
        val(2.0),
        op(OpCode::LoadValConst),
        val(3.0),
        op(OpCode::Add),
        op(OpCode::LoadAddrConst),
        StreamElement::Addr(out_addr),
        op(OpCode::StoreInt),
        op(OpCode::Halt),
    ];
    assemble(&mut image, &elements).unwrap();

    let mut vm = Vm::new();
    vm.run(&image).unwrap();
    assert_eq!(out, 5);
}

// Scenario S2: conditional jump taken.
#[test]
fn s2_conditional_jump_taken() {
    let mut out: i64 = -1;
    let out_addr = Address::from_mut_ptr(&mut out as *mut i64);

    let mut image = ProgramImage::new();
    let elements = vec![
        op(OpCode::LoadAddrConst),
        StreamElement::LabelRef("target".to_owned()),
        op(OpCode::LoadValConst),
        val(0.0),
        op(OpCode::Je),
        // fall-through: store 0, halt.
        op(OpCode::LoadValConst),
        val(0.0),
        op(OpCode::LoadAddrConst),
        StreamElement::Addr(out_addr),
        op(OpCode::StoreInt),
        op(OpCode::Halt),
        StreamElement::Label("target".to_owned()),
        op(OpCode::LoadValConst),
        val(7.0),
        op(OpCode::LoadAddrConst),
        StreamElement::Addr(out_addr),
        op(OpCode::StoreInt),
        op(OpCode::Halt),
    ];
    assemble(&mut image, &elements).unwrap();

    let mut vm = Vm::new();
    vm.run(&image).unwrap();
    assert_eq!(out, 7);
}

// Scenario S3: conditional jump not taken; the pushed address is discarded,
// leaving the value stack empty at HALT.
#[test]
fn s3_conditional_jump_not_taken() {
    let mut out: i64 = -1;
    let out_addr = Address::from_mut_ptr(&mut out as *mut i64);

    let mut image = ProgramImage::new();
    let elements = vec![
        op(OpCode::LoadAddrConst),
        StreamElement::LabelRef("target".to_owned()),
        op(OpCode::LoadValConst),
        val(1.0),
        op(OpCode::Je),
        op(OpCode::LoadValConst),
        val(0.0),
        op(OpCode::LoadAddrConst),
        StreamElement::Addr(out_addr),
        op(OpCode::StoreInt),
        op(OpCode::Halt),
        StreamElement::Label("target".to_owned()),
        op(OpCode::LoadValConst),
        val(7.0),
        op(OpCode::LoadAddrConst),
        StreamElement::Addr(out_addr),
        op(OpCode::StoreInt),
        op(OpCode::Halt),
    ];
    assemble(&mut image, &elements).unwrap();

    let mut vm = Vm::new();
    vm.run(&image).unwrap();
    assert_eq!(out, 0);
    assert!(vm.value_stack().is_empty());
}

// Scenario S4: loop summing 2+3+4+5 into four adjacent int slots, walked by
// a pointer incremented by 4 bytes each iteration, grounded directly on
// `original_source/vm.cpp`'s `sumTest`. Four 4-byte int slots occupy
// [-24, -8); the pointer slot holding the walking cursor is 8 bytes wide
// (this VM's `Address` is pointer-sized, unlike the reference's 32-bit
// `Addr`) and occupies [-8, 0) — which conveniently puts the pointer slot's
// own offset, -8, exactly one past the last int slot, giving the loop exit
// condition for free.
#[test]
fn s4_loop_sum() {
    let mut res: i64 = -1;
    let res_addr = Address::from_mut_ptr(&mut res as *mut i64);

    let mut image = ProgramImage::new();
    let mut elements = vec![op(OpCode::PushbConst), val(24.0)];

    for (value, offset) in [(2.0, -24.0), (3.0, -20.0), (4.0, -16.0), (5.0, -12.0)] {
        elements.push(op(OpCode::LoadValConst));
        elements.push(val(value));
        elements.push(op(OpCode::LoadStackOffsConst));
        elements.push(val(offset));
        elements.push(op(OpCode::StoreInt));
    }

    // pointer slot (-8) := address of the first int slot (sp-24).
    elements.push(op(OpCode::LoadStackOffsConst));
    elements.push(val(-24.0));
    elements.push(op(OpCode::LoadStackOffsConst));
    elements.push(val(-8.0));
    elements.push(op(OpCode::StoreAddr));

    // accumulator starts at 0 on the value stack.
    elements.push(op(OpCode::LoadValConst));
    elements.push(val(0.0));

    elements.push(StreamElement::Label("loop1".to_owned()));

    // acc += *cursor
    elements.push(op(OpCode::LoadStackOffsConst));
    elements.push(val(-8.0));
    elements.push(op(OpCode::LoadAddr));
    elements.push(op(OpCode::LoadInt));
    elements.push(op(OpCode::Add));

    // cursor += 4
    elements.push(op(OpCode::LoadStackOffsConst));
    elements.push(val(-8.0));
    elements.push(op(OpCode::LoadAddr));
    elements.push(op(OpCode::LoadValConst));
    elements.push(val(4.0));
    elements.push(op(OpCode::Add));
    elements.push(op(OpCode::LoadStackOffsConst));
    elements.push(val(-8.0));
    elements.push(op(OpCode::StoreAddr));

    // loop while cursor < one-past-the-end (which is sp-8, the pointer
    // slot's own address).
    elements.push(op(OpCode::LoadAddrConst));
    elements.push(StreamElement::LabelRef("loop1".to_owned()));
    elements.push(op(OpCode::LoadStackOffsConst));
    elements.push(val(-8.0));
    elements.push(op(OpCode::LoadAddr));
    elements.push(op(OpCode::LoadStackOffsConst));
    elements.push(val(-8.0));
    elements.push(op(OpCode::Sub));
    elements.push(op(OpCode::Jlt));

    elements.push(op(OpCode::LoadAddrConst));
    elements.push(StreamElement::Addr(res_addr));
    elements.push(op(OpCode::StoreInt));
    elements.push(op(OpCode::Halt));

    assemble(&mut image, &elements).unwrap();

    let mut vm = Vm::new();
    vm.run(&image).unwrap();
    assert_eq!(res, 14);
}

// Scenario S5.
#[test]
fn s5_scanner() {
    let tokens = Lexer::new("123 (0456.@$@%789)))").scan().unwrap();
    let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["123", "(", "0456", ".@$@%789", ")", ")", ")", ""]);
}

// Scenario S6.
#[test]
fn s6_parser_round_trip() {
    let tokens = Lexer::new("(tata () zaza (baz (kaka ())))").scan().unwrap();
    let node = Parser::new(&tokens).read_expr().unwrap();
    match &node {
        AstNode::List(_) => {}
        _ => panic!("expected a list"),
    }
    assert_eq!(node.print(), "(tata ( ) zaza (baz (kaka ( ) ) ) )");
}

// Scenario S7: trap coverage.
#[test]
fn s7_traps_instead_of_undefined_behaviour() {
    use stackvm::VmTrap;

    let mut image = ProgramImage::new();
    image.write_op(OpCode::Add);
    let mut vm = Vm::new();
    assert_eq!(vm.run(&image).unwrap_err(), VmTrap::StackUnderflow);

    let mut image = ProgramImage::new();
    image.write_op_value(OpCode::LoadValConst, Value::from_f64(1.0));
    image.write_op_value(OpCode::LoadValConst, Value::from_f64(0.0));
    image.write_op(OpCode::Mod);
    let mut vm = Vm::new();
    assert_eq!(vm.run(&image).unwrap_err(), VmTrap::DivisionByZero);

    let mut image = ProgramImage::new();
    image.write_op_addr(OpCode::LoadAddrConst, Address::NULL);
    image.write_op(OpCode::Jmp);
    let mut vm = Vm::new();
    assert_eq!(vm.run(&image).unwrap_err(), VmTrap::NullPointerDereference);

    let mut image = ProgramImage::new();
    image.write_op_value(OpCode::PushbConst, Value::from_i64(16));
    let mut vm = Vm::with_capacity(8);
    assert_eq!(vm.run(&image).unwrap_err(), VmTrap::ByteStackOverflow);
}
