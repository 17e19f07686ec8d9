/// Rebuild a command line from its arguments.
///
/// Arguments are joined with single spaces; an argument containing a space is
/// wrapped in double quotes.
pub fn make_command_line<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::new();
    for (idx, arg) in args.into_iter().enumerate() {
        let arg = arg.as_ref();
        if idx > 0 {
            line.push(' ');
        }
        if arg.contains(' ') {
            line.push('"');
            line.push_str(arg);
            line.push('"');
        } else {
            line.push_str(arg);
        }
    }
    line
}
