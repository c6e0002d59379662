use thiserror::Error;

/// Raised by the lexer when it encounters a byte that does not start any
/// recognised token.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
}

/// Raised by the parser (and the local-context helper) on a grammar
/// violation or an undefined-variable reference.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilationError {
    #[error("expected '{0}'")]
    ExpectedToken(&'static str),
    #[error("unexpected '{0}'")]
    UnexpectedToken(String),
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
}

/// Raised by the assembler on an operand-shape mismatch or an unresolved
/// label reference.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssemblerError {
    #[error("expected an opcode")]
    ExpectedOpcode,
    #[error("expected a value operand")]
    ExpectedValue,
    #[error("expected an address or label operand")]
    ExpectedAddressOrLabel,
    #[error("unknown label '{0}'")]
    UnknownLabel(String),
    #[error("unexpected end of instruction stream")]
    UnexpectedEnd,
}

/// Raised by the VM when it detects a runtime condition the reference
/// implementation left as undefined behaviour.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VmTrap {
    #[error("value stack underflow")]
    StackUnderflow,
    #[error("instruction pointer {0} out of bounds")]
    IpOutOfBounds(usize),
    #[error("byte stack overflow")]
    ByteStackOverflow,
    #[error("byte stack underflow")]
    ByteStackUnderflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("null pointer dereference")]
    NullPointerDereference,
    #[error("instruction budget exhausted")]
    BudgetExhausted,
    #[error("unknown opcode byte 0x{0:02x}")]
    UnknownOpcode(u8),
}

/// Umbrella error covering the whole pipeline, for callers that drive
/// lexing, parsing, assembly, and execution from one call site.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolchainError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Compilation(#[from] CompilationError),
    #[error(transparent)]
    Assembler(#[from] AssemblerError),
    #[error(transparent)]
    Vm(#[from] VmTrap),
}
